//! Per-connection driver: glue between parser, router, and emitter.

use crate::errors::ParseError;
use crate::http::parser::RequestParser;
use crate::http::response::Response;
use crate::http::status::StatusCode;
use crate::io::{ByteSource, Sink, SocketSource, SocketWriter};
use crate::limits::ServerLimits;
use crate::router::Router;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tracing::{debug, error};

/// Serves one accepted TCP connection to completion.
pub(crate) async fn serve(stream: TcpStream, router: Arc<Router>, limits: ServerLimits) {
    let (read_half, write_half) = stream.into_split();
    let source = SocketSource::new(read_half, limits.request_timeout);
    let parser = RequestParser::new(source, &limits);
    let sink = Box::new(SocketWriter::new(write_half));

    drive(parser, sink, &router, &limits).await;
}

/// The request/response loop, generic over the transport so tests can
/// run it over in-memory sources and sinks.
///
/// Per iteration: race `parser.next()` against the request deadline;
/// on a request, dispatch through the router and finalize the
/// response; on a parse error, answer with its status code and close.
/// Responses complete before the next parse begins, so request order
/// equals response order. The socket halves are dropped - and the
/// connection with them - on every exit path.
pub(crate) async fn drive<S: ByteSource>(
    mut parser: RequestParser<S>,
    mut sink: Box<dyn Sink>,
    router: &Router,
    limits: &ServerLimits,
) {
    loop {
        let parsed = tokio::select! {
            biased;

            parsed = parser.next() => parsed,
            _ = sleep(limits.request_timeout) => {
                debug!("request deadline expired, shutting down connection");
                let _ = sink.shutdown().await;
                return;
            }
        };

        let mut request = match parsed {
            None => return,
            Some(Err(err)) => {
                // The source itself failed; nobody is listening for a
                // status response.
                if err == ParseError::ReaderClosed {
                    debug!("byte source failed mid-request");
                    return;
                }

                debug!(%err, "rejecting malformed request");
                let mut response = Response::from_status(sink, err.status_code());
                let _ = response.send().await;
                return;
            }
            Some(Ok(request)) => request,
        };

        let is_head = request.method == "HEAD";
        let mut response = Response::new(sink, is_head);

        let outcome = AssertUnwindSafe(router.handle(&mut request, &mut response))
            .catch_unwind()
            .await;

        if outcome.is_err() {
            error!(method = %request.method, uri = %request.uri, "handler panicked");
            if response.nothing_sent() {
                let mut failure =
                    Response::from_status(response.into_sink(), StatusCode::INTERNAL_SERVER_ERROR);
                let _ = failure.send().await;
            } else {
                // The head is already on the wire; all we can do is
                // cut the stream short.
                let _ = response.shutdown().await;
            }
            return;
        }

        if response.send().await.is_err() {
            return;
        }
        sink = response.into_sink();
    }
}
