//! Response construction and emission.
//!
//! A [`Response`] supports exactly one of three output disciplines per
//! request - buffered body, fixed-length streaming, chunked streaming -
//! tracked by a monotonic state machine. Calling an operation out of
//! order is a programmer error and panics; the driver-facing
//! [`Response::send`] finalizes whatever the handler chose.

use crate::http::headers::HeaderMap;
use crate::http::status::StatusCode;
use crate::io::Sink;
use std::io;

/// Output discipline, tagged with per-mode data.
#[derive(Debug)]
enum Output {
    /// Nothing chosen yet; `send` emits an empty buffered body.
    Uninitialized,
    /// `set_body` was called; bytes go out with the head on `send`.
    Body(Vec<u8>),
    /// Head is on the wire with `Content-Length`; the handler writes
    /// the body through a [`FixedStream`].
    StreamFixed,
    /// Head is on the wire with `Transfer-Encoding: chunked`.
    StreamChunked,
    /// Everything has been emitted.
    Sent,
}

/// An HTTP/1.1 response bound to a byte sink.
///
/// Constructed by the connection driver for every request and handed to
/// the router; handlers mutate `status` and `headers` and pick one
/// output discipline. A fresh response is `200 OK` with
/// `Content-Length: 0`, so a handler that does nothing still produces a
/// well-formed reply.
///
/// # Panics
///
/// State misuse - `set_body` after a stream was opened, opening two
/// streams, streaming after `send` - panics. The state machine only
/// moves forward.
pub struct Response {
    /// Status code of the status line.
    pub status: StatusCode,
    /// Header section. `Content-Length` and `Transfer-Encoding` are
    /// managed by the output operations; setting them by hand is not
    /// prevented but will be overwritten.
    pub headers: HeaderMap,
    cookies: Vec<String>,
    output: Output,
    is_head: bool,
    sink: Box<dyn Sink>,
}

impl Response {
    /// A fresh response over `sink`. `is_head` elides body bytes at
    /// emission time while keeping `Content-Length` intact.
    pub fn new(sink: Box<dyn Sink>, is_head: bool) -> Self {
        let mut headers = HeaderMap::with_capacity(8);
        headers.set("Content-Length", "0");

        Self {
            status: StatusCode::OK,
            headers,
            cookies: Vec::new(),
            output: Output::Uninitialized,
            is_head,
            sink,
        }
    }

    /// Error-path constructor: a bare status response.
    pub fn from_status(sink: Box<dyn Sink>, status: StatusCode) -> Self {
        let mut response = Self::new(sink, false);
        response.status = status;
        response
    }

    /// Whether body bytes are elided on emission.
    pub fn is_head(&self) -> bool {
        self.is_head
    }

    /// Appends a raw `Set-Cookie` value, emitted verbatim alongside the
    /// headers. The emitter does not parse or validate it.
    ///
    /// # Examples
    /// ```
    /// let mut res = wharf::doctest::response();
    /// res.add_cookie("session=abc123; HttpOnly; Path=/");
    /// res.add_cookie("theme=dark");
    /// // Emitted as two separate Set-Cookie lines.
    /// ```
    pub fn add_cookie(&mut self, cookie: impl Into<String>) {
        self.cookies.push(cookie.into());
    }

    /// Buffers `body` for emission and sets `Content-Length`.
    ///
    /// # Examples
    /// ```
    /// use wharf::StatusCode;
    ///
    /// let mut res = wharf::doctest::response();
    /// res.status = StatusCode::CREATED;
    /// res.headers.set("Content-Type", "application/json");
    /// res.set_body(r#"{"id": 7}"#);
    /// ```
    ///
    /// # Panics
    /// Panics unless this is the first output operation.
    pub fn set_body(&mut self, body: impl Into<Vec<u8>>) {
        assert!(
            matches!(self.output, Output::Uninitialized),
            "set_body requires an untouched response"
        );

        let body = body.into();
        self.headers.set("Content-Length", body.len().to_string());
        self.output = Output::Body(body);
    }

    /// Opens a fixed-length stream: sets `Content-Length: {size}`,
    /// emits the head immediately, and returns a writer. The emitter
    /// trusts the handler to write exactly `size` bytes in total.
    ///
    /// # Examples
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> std::io::Result<()> {
    /// let mut res = wharf::doctest::response();
    /// let mut body = res.send_fixed(11).await?;
    /// body.write(b"Hello").await?;
    /// body.write(b" World").await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Panics
    /// Panics unless this is the first output operation.
    pub async fn send_fixed(&mut self, size: usize) -> io::Result<FixedStream<'_>> {
        assert!(
            matches!(self.output, Output::Uninitialized),
            "send_fixed requires an untouched response"
        );

        self.headers.set("Content-Length", size.to_string());
        let head = self.build_head();
        self.sink.write(&[&head]).await?;
        self.output = Output::StreamFixed;

        Ok(FixedStream { response: self })
    }

    /// Opens a chunked stream: replaces any `Content-Length` with
    /// `Transfer-Encoding: chunked`, emits the head immediately, and
    /// returns a writer.
    ///
    /// # Examples
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() -> std::io::Result<()> {
    /// let mut res = wharf::doctest::response();
    /// let mut body = res.send_chunked().await?;
    /// body.write(b"Wiki").await?;
    /// body.write(b"pedia").await?;
    /// body.end().await?;
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Panics
    /// Panics unless this is the first output operation.
    pub async fn send_chunked(&mut self) -> io::Result<ChunkedStream<'_>> {
        assert!(
            matches!(self.output, Output::Uninitialized),
            "send_chunked requires an untouched response"
        );

        self.headers.unset("Content-Length");
        self.headers.set("Transfer-Encoding", "chunked");
        let head = self.build_head();
        self.sink.write(&[&head]).await?;
        self.output = Output::StreamChunked;

        Ok(ChunkedStream { response: self })
    }

    /// Driver-side finalization.
    ///
    /// - `Sent` or `StreamFixed`: nothing to do (the handler's stream
    ///   writes already went out).
    /// - `StreamChunked` without an explicit `end()`: emits the
    ///   terminating zero chunk.
    /// - Otherwise: emits status line, headers, cookies, and - unless
    ///   this is a HEAD response - the buffered body, as one vectored
    ///   write.
    pub async fn send(&mut self) -> io::Result<()> {
        match &self.output {
            Output::Sent | Output::StreamFixed => Ok(()),
            Output::StreamChunked => {
                self.sink.write(&[b"0\r\n\r\n"]).await?;
                self.output = Output::Sent;
                Ok(())
            }
            Output::Uninitialized | Output::Body(_) => {
                let head = self.build_head();
                let body = match std::mem::replace(&mut self.output, Output::Sent) {
                    Output::Body(body) => body,
                    _ => Vec::new(),
                };

                if self.is_head || body.is_empty() {
                    self.sink.write(&[&head]).await
                } else {
                    self.sink.write(&[&head, &body]).await
                }
            }
        }
    }

    /// Recovers the sink for the next request on the connection.
    pub fn into_sink(self) -> Box<dyn Sink> {
        self.sink
    }

    /// Whether nothing has reached the wire yet - the driver may still
    /// replace this response with an error response.
    pub(crate) fn nothing_sent(&self) -> bool {
        matches!(self.output, Output::Uninitialized | Output::Body(_))
    }

    /// Shuts down the underlying sink.
    pub(crate) async fn shutdown(&mut self) -> io::Result<()> {
        self.sink.shutdown().await
    }

    /// `status-line CRLF *(header CRLF) *(Set-Cookie CRLF) CRLF`.
    /// The reason phrase appears only for codes in the canonical table.
    fn build_head(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(128);

        head.extend_from_slice(b"HTTP/1.1 ");
        head.extend_from_slice(self.status.code().to_string().as_bytes());
        if let Some(reason) = self.status.reason() {
            head.push(b' ');
            head.extend_from_slice(reason.as_bytes());
        }
        head.extend_from_slice(b"\r\n");

        for (name, value) in self.headers.iter() {
            head.extend_from_slice(name.as_bytes());
            head.extend_from_slice(b": ");
            head.extend_from_slice(value.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
        for cookie in &self.cookies {
            head.extend_from_slice(b"Set-Cookie: ");
            head.extend_from_slice(cookie.as_bytes());
            head.extend_from_slice(b"\r\n");
        }
        head.extend_from_slice(b"\r\n");

        head
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("output", &self.output)
            .field("is_head", &self.is_head)
            .finish_non_exhaustive()
    }
}

/// Writer returned by [`Response::send_fixed`].
///
/// Bytes pass through untouched; the handler owes the sink exactly the
/// length it declared.
pub struct FixedStream<'a> {
    response: &'a mut Response,
}

impl FixedStream<'_> {
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if self.response.is_head {
            return Ok(());
        }
        self.response.sink.write(&[chunk]).await
    }
}

/// Writer returned by [`Response::send_chunked`].
pub struct ChunkedStream<'a> {
    response: &'a mut Response,
}

impl ChunkedStream<'_> {
    /// Emits one chunk as `hex-size CRLF chunk CRLF`.
    ///
    /// Empty chunks are silently dropped - a zero-length chunk is the
    /// stream terminator on the wire and would cut the response short.
    pub async fn write(&mut self, chunk: &[u8]) -> io::Result<()> {
        if chunk.is_empty() || self.response.is_head {
            return Ok(());
        }

        let size_line = format!("{:x}\r\n", chunk.len());
        self.response
            .sink
            .write(&[size_line.as_bytes(), chunk, b"\r\n"])
            .await
    }

    /// Terminates the stream with `0 CRLF CRLF`. Dropping the stream
    /// without calling `end` is fine: [`Response::send`] emits the
    /// terminator instead.
    pub async fn end(self) -> io::Result<()> {
        self.response.sink.write(&[b"0\r\n\r\n"]).await?;
        self.response.output = Output::Sent;
        Ok(())
    }
}
