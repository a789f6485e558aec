//! wharf - an incremental HTTP/1.1 server library
//!
//! Three tightly coupled pieces make up the core:
//!
//! - An **incremental request parser** ([`RequestParser`]) that pulls
//!   byte chunks from a [`ByteSource`] and frames complete
//!   [`Request`]s, enforcing RFC 9110/9112 grammar and hard limits on
//!   header and body size.
//! - A **response emitter** ([`Response`]) with three mutually
//!   exclusive output modes - buffered body, fixed-length streaming,
//!   chunked streaming - behind a monotonic state machine.
//! - A **URI router** ([`Router`]) with exact > parameter > wildcard
//!   match priority, per-method dispatch, automatic `HEAD`/`OPTIONS`
//!   handling, and onion-style middleware.
//!
//! A thin TCP boundary ([`Server`]) wires the three together: one
//! cooperative task per connection, responses written strictly in
//! request order, every request bounded by [`ServerLimits`].
//!
//! # Quick Start
//!
//! ```no_run
//! use wharf::{methods, BoxFuture, Request, Response, Router, Server};
//! use tokio::net::TcpListener;
//!
//! fn ping<'a>(_req: &'a Request, res: &'a mut Response) -> BoxFuture<'a, ()> {
//!     Box::pin(async move { res.set_body("pong") })
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::new();
//!     router.route("/ping", methods::get(ping)).unwrap();
//!
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
//!         .router(router)
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

pub(crate) mod http {
    pub mod headers;
    pub mod parser;
    pub mod request;
    pub mod response;
    pub mod status;
    pub mod uri;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod server_impl;
}
pub mod errors;
pub mod io;
pub mod limits;
pub mod router;

#[doc(hidden)]
pub mod doctest {
    //! Helpers for documentation examples only.

    use crate::io::{BoxFuture, Sink};
    use crate::Response;
    use std::io;

    /// Discards everything written to it, so examples can build a
    /// [`Response`] without a socket.
    pub struct NullSink;

    impl Sink for NullSink {
        fn write<'a>(&'a mut self, _parts: &'a [&'a [u8]]) -> BoxFuture<'a, io::Result<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    /// A throwaway response over a [`NullSink`].
    pub fn response() -> Response {
        Response::new(Box::new(NullSink), false)
    }
}

pub use crate::{
    errors::{ParseError, RouterError},
    http::{
        headers::HeaderMap,
        parser::RequestParser,
        request::Request,
        response::{ChunkedStream, FixedStream, Response},
        status::StatusCode,
        uri::{percent_decode, percent_encode, Uri, UriMatch},
    },
    io::{BoxFuture, ByteSource, Sink, SocketSource, SocketWriter, SourceError},
    limits::ServerLimits,
    router::{methods, Handler, MethodHandler, Middleware, Next, Router},
    server::server_impl::{bind_and_listen, Server, ServerBuilder},
};
