//! Incremental HTTP/1.1 request parser.
//!
//! [`RequestParser`] pulls byte chunks from a [`ByteSource`] and frames
//! complete [`Request`] values, enforcing RFC 9110/9112 grammar and the
//! configured size limits as it goes. It exposes exactly one operation,
//! [`RequestParser::next`].

use crate::errors::ParseError;
use crate::http::headers::HeaderMap;
use crate::http::request::Request;
use crate::http::uri::Uri;
use crate::io::{ByteSource, SourceError};
use crate::limits::ServerLimits;
use memchr::memchr;
use memchr::memmem;
use std::collections::HashMap;
use std::ops::Range;
use std::str;

/// Upper bound on a chunk-size line (`hex CRLF`). Sixteen hex digits
/// already cover the full usize range; anything longer is garbage.
const CHUNK_SIZE_LINE_MAX: usize = 32;

/// Why framing stopped before a request was produced.
enum Interrupt {
    /// The source reported `Closed`. Indistinguishable from a clean
    /// client disconnect between requests, so never an error.
    Eof,
    Error(ParseError),
}

impl From<ParseError> for Interrupt {
    fn from(err: ParseError) -> Self {
        Interrupt::Error(err)
    }
}

/// A long-lived incremental parser bound to one byte source.
///
/// The parser owns a growable buffer; bytes left over after a framed
/// request stay buffered so pipelined requests parse back-to-back.
/// Pre-body buffering is bounded by `max_header_size`, body buffering
/// by `max_body_size`.
///
/// # Examples
/// ```no_run
/// # async fn example<S: wharf::ByteSource>(source: S) {
/// use wharf::{RequestParser, ServerLimits};
///
/// let mut parser = RequestParser::new(source, &ServerLimits::default());
/// while let Some(result) = parser.next().await {
///     match result {
///         Ok(request) => println!("{} {}", request.method, request.uri),
///         Err(err) => {
///             eprintln!("rejecting connection: {err}");
///             break;
///         }
///     }
/// }
/// # }
/// ```
pub struct RequestParser<S> {
    source: S,
    buffer: Vec<u8>,
    /// Start of the unconsumed region of `buffer`.
    pos: usize,
    max_header_size: usize,
    max_body_size: usize,
}

impl<S: ByteSource> RequestParser<S> {
    pub fn new(source: S, limits: &ServerLimits) -> Self {
        Self {
            source,
            buffer: Vec::new(),
            pos: 0,
            max_header_size: limits.max_header_size,
            max_body_size: limits.max_body_size,
        }
    }

    /// Frames the next request.
    ///
    /// Returns `None` on end-of-stream: the source closed with nothing
    /// mid-frame worth reporting (a partial request cut off by a close
    /// is treated the same way, because it is indistinguishable from a
    /// client hanging up between requests). A `Some(Err(..))` leaves
    /// the parser reset with an empty buffer; the caller is expected
    /// to answer with the error's status code and close.
    pub async fn next(&mut self) -> Option<Result<Request, ParseError>> {
        match self.parse_one().await {
            Ok(request) => Some(Ok(request)),
            Err(Interrupt::Eof) => None,
            Err(Interrupt::Error(err)) => {
                self.reset();
                Some(Err(err))
            }
        }
    }

    async fn parse_one(&mut self) -> Result<Request, Interrupt> {
        self.compact();

        // Bytes of request-line + header lines, CRLFs included.
        let mut head_used = 0;

        self.skip_leading_crlf(&mut head_used).await?;
        let (method, uri) = self.parse_request_line(&mut head_used).await?;
        let headers = self
            .parse_header_section(&mut head_used, self.max_header_size, ParseError::HeaderTooLarge)
            .await?;

        let (body, trailers) = self.parse_body(&headers).await?;

        let cookies = Request::extract_cookies(&headers);

        Ok(Request {
            method,
            uri,
            headers,
            trailers,
            body,
            cookies,
            path_params: HashMap::new(),
            wildcard_path: String::new(),
        })
    }

    /// RFC 9112 §2.2: ignore empty lines received prior to the
    /// request-line. They are charged against the header budget so a
    /// CRLF flood still terminates.
    async fn skip_leading_crlf(&mut self, used: &mut usize) -> Result<(), Interrupt> {
        loop {
            match &self.buffer[self.pos..] {
                [b'\r', b'\n', ..] => {
                    self.pos += 2;
                    *used += 2;
                    if *used > self.max_header_size {
                        return Err(ParseError::HeaderTooLarge.into());
                    }
                }
                // Not enough bytes to decide yet.
                [b'\r'] | [] => self.fill().await?,
                _ => return Ok(()),
            }
        }
    }

    async fn parse_request_line(
        &mut self,
        used: &mut usize,
    ) -> Result<(String, Uri), Interrupt> {
        let range = self
            .read_line(used, self.max_header_size, ParseError::HeaderTooLarge)
            .await?;
        let line =
            str::from_utf8(&self.buffer[range]).map_err(|_| ParseError::InvalidRequestLine)?;

        let mut parts = line.split(' ');
        let method = parts.next().unwrap_or("");
        let target = parts.next().ok_or(ParseError::InvalidRequestLine)?;
        let version = parts.next().ok_or(ParseError::InvalidRequestLine)?;
        if parts.next().is_some() {
            return Err(ParseError::InvalidRequestLine.into());
        }

        if !is_token(method) {
            return Err(ParseError::InvalidRequestLine.into());
        }
        if version != "HTTP/1.1" {
            return Err(ParseError::InvalidRequestLine.into());
        }
        let uri = Uri::parse(target).ok_or(ParseError::InvalidRequestLine)?;

        Ok((method.to_string(), uri))
    }

    /// Reads `name: value` lines into a map until a blank line. Shared
    /// between the header section and the chunked trailer section.
    async fn parse_header_section(
        &mut self,
        used: &mut usize,
        max: usize,
        overflow: ParseError,
    ) -> Result<HeaderMap, Interrupt> {
        let mut map = HeaderMap::new();

        loop {
            let range = self.read_line(used, max, overflow).await?;
            if range.is_empty() {
                return Ok(map);
            }
            let (name, value) = parse_header_line(&self.buffer[range])?;
            map.add(name, value);
        }
    }

    async fn parse_body(
        &mut self,
        headers: &HeaderMap,
    ) -> Result<(Vec<u8>, HeaderMap), Interrupt> {
        let content_length = headers.get("Content-Length");
        let transfer_encoding = headers.get("Transfer-Encoding");

        if content_length.is_some() && transfer_encoding.is_some() {
            return Err(ParseError::InvalidHeader.into());
        }

        if let Some(encoding) = transfer_encoding {
            if encoding != "chunked" {
                return Err(ParseError::UnsupportedTransferEncoding.into());
            }
            return self.parse_chunked_body().await;
        }

        if let Some(value) = content_length {
            let length = parse_content_length(value)?;
            if length > self.max_body_size {
                return Err(ParseError::ContentTooLarge.into());
            }
            let body = self.read_exact(length).await?;
            return Ok((body, HeaderMap::new()));
        }

        Ok((Vec::new(), HeaderMap::new()))
    }

    async fn parse_chunked_body(&mut self) -> Result<(Vec<u8>, HeaderMap), Interrupt> {
        let mut body = Vec::new();

        loop {
            let mut line_used = 0;
            let range = self
                .read_line(&mut line_used, CHUNK_SIZE_LINE_MAX, ParseError::InvalidChunkEncoding)
                .await?;
            let size = parse_chunk_size(&self.buffer[range])?;

            if size == 0 {
                break;
            }
            if self.max_body_size - body.len() < size {
                return Err(ParseError::ContentTooLarge.into());
            }

            // Chunk data plus its terminating CRLF.
            while self.buffer.len() - self.pos < size + 2 {
                self.fill().await?;
            }
            if &self.buffer[self.pos + size..self.pos + size + 2] != b"\r\n" {
                return Err(ParseError::InvalidChunkEncoding.into());
            }
            body.extend_from_slice(&self.buffer[self.pos..self.pos + size]);
            self.pos += size + 2;
        }

        let mut trailer_used = 0;
        let trailers = self
            .parse_header_section(
                &mut trailer_used,
                self.max_header_size,
                ParseError::HeaderTooLarge,
            )
            .await?;

        Ok((body, trailers))
    }

    /// Finds the next CRLF within the remaining budget, consumes the
    /// line including its CRLF, and returns the line's range in the
    /// buffer (valid until the next `next()` call compacts it).
    async fn read_line(
        &mut self,
        used: &mut usize,
        max: usize,
        overflow: ParseError,
    ) -> Result<Range<usize>, Interrupt> {
        let remaining = max.saturating_sub(*used);
        let length = self.pull_until(b"\r\n", remaining, overflow).await?;

        let start = self.pos;
        self.pos += length + 2;
        *used += length + 2;

        Ok(start..start + length)
    }

    /// The fundamental bounded read: pulls from the source until
    /// `needle` occurs in the unconsumed region or more than `max`
    /// bytes have been scanned without finding it, which yields
    /// `overflow`. Returns the needle's offset from the current
    /// position.
    async fn pull_until(
        &mut self,
        needle: &[u8],
        max: usize,
        overflow: ParseError,
    ) -> Result<usize, Interrupt> {
        loop {
            let avail = &self.buffer[self.pos..];
            if let Some(index) = memmem::find(avail, needle) {
                if index + needle.len() > max {
                    return Err(overflow.into());
                }
                return Ok(index);
            }
            if avail.len() >= max {
                return Err(overflow.into());
            }
            self.fill().await?;
        }
    }

    async fn read_exact(&mut self, length: usize) -> Result<Vec<u8>, Interrupt> {
        while self.buffer.len() - self.pos < length {
            self.fill().await?;
        }
        let body = self.buffer[self.pos..self.pos + length].to_vec();
        self.pos += length;
        Ok(body)
    }

    /// Pulls one chunk from the source into the buffer.
    async fn fill(&mut self) -> Result<(), Interrupt> {
        match self.source.pull().await {
            Ok(chunk) => {
                self.buffer.extend_from_slice(chunk);
                Ok(())
            }
            Err(SourceError::Closed) => Err(Interrupt::Eof),
            Err(SourceError::Timeout) | Err(SourceError::Unknown) => {
                Err(ParseError::ReaderClosed.into())
            }
        }
    }

    /// Drops consumed bytes, keeping any pipelined remainder.
    fn compact(&mut self) {
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.pos = 0;
        }
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.pos = 0;
    }
}

/// RFC 9110 §5.6.2 token.
fn is_token(s: &str) -> bool {
    !s.is_empty()
        && s.bytes().all(|b| {
            b.is_ascii_alphanumeric()
                || matches!(
                    b,
                    b'!' | b'#'
                        | b'$'
                        | b'%'
                        | b'&'
                        | b'\''
                        | b'*'
                        | b'+'
                        | b'-'
                        | b'.'
                        | b'^'
                        | b'_'
                        | b'`'
                        | b'|'
                        | b'~'
                )
        })
}

/// `name ":" OWS value OWS`. The token rule on the name also rejects
/// whitespace between the name and the colon.
fn parse_header_line(line: &[u8]) -> Result<(String, String), ParseError> {
    let colon = memchr(b':', line).ok_or(ParseError::InvalidHeader)?;

    let name = str::from_utf8(&line[..colon]).map_err(|_| ParseError::InvalidHeader)?;
    if !is_token(name) {
        return Err(ParseError::InvalidHeader);
    }

    let mut value = &line[colon + 1..];
    while let [b' ' | b'\t', rest @ ..] = value {
        value = rest;
    }
    while let [rest @ .., b' ' | b'\t'] = value {
        value = rest;
    }

    let valid = value
        .iter()
        .all(|&b| b == 0x09 || (0x20..=0x7E).contains(&b) || b >= 0x80);
    if !valid {
        return Err(ParseError::InvalidHeader);
    }
    let value = str::from_utf8(value).map_err(|_| ParseError::InvalidHeader)?;

    Ok((name.to_string(), value.to_string()))
}

fn parse_content_length(value: &str) -> Result<usize, ParseError> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ParseError::InvalidHeader);
    }
    value.parse().map_err(|_| ParseError::InvalidHeader)
}

fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let line = str::from_utf8(line).map_err(|_| ParseError::InvalidChunkEncoding)?;
    if line.is_empty() {
        return Err(ParseError::InvalidChunkEncoding);
    }
    usize::from_str_radix(line, 16).map_err(|_| ParseError::InvalidChunkEncoding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::testing::{ChunkSource, StalledSource};

    fn parser_for(input: &str) -> RequestParser<ChunkSource> {
        RequestParser::new(ChunkSource::whole(input), &ServerLimits::default())
    }

    async fn parse_whole(input: &str) -> Option<Result<Request, ParseError>> {
        parser_for(input).next().await
    }

    async fn parse_byte_by_byte(input: &str) -> Option<Result<Request, ParseError>> {
        let mut parser =
            RequestParser::new(ChunkSource::byte_by_byte(input), &ServerLimits::default());
        parser.next().await
    }

    #[tokio::test]
    async fn simple_get() {
        let req = parse_whole("GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(req.method, "GET");
        assert_eq!(req.uri.paths(), ["index.html"]);
        assert_eq!(req.header("host"), Some("example.com"));
        assert!(req.body.is_empty());
        assert!(req.trailers.is_empty());
    }

    #[tokio::test]
    async fn leading_crlf_tolerated() {
        let req = parse_whole("\r\n\r\nGET /index.html HTTP/1.1\r\n\r\n")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(req.method, "GET");
        assert_eq!(req.uri.paths(), ["index.html"]);
    }

    #[tokio::test]
    async fn invalid_request_lines() {
        #[rustfmt::skip]
        let cases = [
            "INVALID_REQUEST_LINE\r\n\r\n",
            "GET /index.html\r\n\r\n",
            "GET /index.html HTTP/1.1 EXTRA\r\n\r\n",
            "GET  /index.html HTTP/1.1\r\n\r\n",
            "GET /index.html HTTP/2.0\r\n\r\n",
            "GET /index.html HTTP/1.0\r\n\r\n",
            "GET /index.html http/1.1\r\n\r\n",
            "GE==T /index.html HTTP/1.1\r\n\r\n",
            " GET /index.html HTTP/1.1\r\n\r\n",
            "GET index.html HTTP/1.1\r\n\r\n",
            "GET /bad%zz HTTP/1.1\r\n\r\n",
        ];

        for input in cases {
            let result = parse_whole(input).await.unwrap();
            assert_eq!(result, Err(ParseError::InvalidRequestLine), "{input:?}");
        }
    }

    #[tokio::test]
    async fn header_grammar() {
        #[rustfmt::skip]
        let cases: [(&str, Option<(&str, &str)>); 8] = [
            ("X-Custom-Header:    value with spaces   \r\n", Some(("X-Custom-Header", "value with spaces"))),
            ("X-Custom-Header:value with spaces\r\n", Some(("X-Custom-Header", "value with spaces"))),
            ("X-Empty-Header: \r\n",       Some(("X-Empty-Header", ""))),
            ("X-Tab:\tv\t\r\n",            Some(("X-Tab", "v"))),
            ("Inva lid-Header: value\r\n", None),
            ("X-Custom-Header : value\r\n", None),
            (": value\r\n",                None),
            ("Invalid-Header value\r\n",   None),
        ];

        for (line, expected) in cases {
            let input = format!("GET / HTTP/1.1\r\n{line}\r\n");
            let result = parse_whole(&input).await.unwrap();

            match expected {
                Some((name, value)) => {
                    let req = result.unwrap_or_else(|e| panic!("{line:?}: {e}"));
                    assert_eq!(req.header(name), Some(value), "{line:?}");
                }
                None => {
                    assert_eq!(result, Err(ParseError::InvalidHeader), "{line:?}");
                }
            }
        }
    }

    #[tokio::test]
    async fn header_value_rejects_control_bytes() {
        let input = "GET / HTTP/1.1\r\nValid-Header: value\x01\x02\x03\r\n\r\n";
        assert_eq!(
            parse_whole(input).await.unwrap(),
            Err(ParseError::InvalidHeader)
        );
    }

    #[tokio::test]
    async fn content_length_body() {
        let input = "POST /submit HTTP/1.1\r\nHost: example.com\r\nContent-Length: 13\r\n\r\nHello, World!";
        let req = parse_whole(input).await.unwrap().unwrap();

        assert_eq!(req.method, "POST");
        assert_eq!(req.body, b"Hello, World!");
        assert_eq!(req.header("content-length"), Some("13"));
    }

    #[tokio::test]
    async fn zero_length_body() {
        let req = parse_whole("POST /x HTTP/1.1\r\nContent-Length: 0\r\n\r\n")
            .await
            .unwrap()
            .unwrap();

        assert!(req.body.is_empty());
    }

    #[tokio::test]
    async fn invalid_content_length() {
        #[rustfmt::skip]
        let cases = [
            "POST /x HTTP/1.1\r\nContent-Length: invalid\r\n\r\n",
            "POST /x HTTP/1.1\r\nContent-Length: 12a\r\n\r\n",
            "POST /x HTTP/1.1\r\nContent-Length: -5\r\n\r\n",
            "POST /x HTTP/1.1\r\nContent-Length: 1.5\r\n\r\n",
            "POST /x HTTP/1.1\r\nContent-Length: 99999999999999999999999\r\n\r\n",
            "POST /x HTTP/1.1\r\nContent-Length: \r\n\r\n",
        ];

        for input in cases {
            assert_eq!(
                parse_whole(input).await.unwrap(),
                Err(ParseError::InvalidHeader),
                "{input:?}"
            );
        }
    }

    #[tokio::test]
    async fn body_over_limit() {
        let limits = ServerLimits {
            max_body_size: 16,
            ..ServerLimits::default()
        };
        let input = "POST /x HTTP/1.1\r\nContent-Length: 17\r\n\r\n01234567890123456";
        let mut parser = RequestParser::new(ChunkSource::whole(input), &limits);

        assert_eq!(
            parser.next().await.unwrap(),
            Err(ParseError::ContentTooLarge)
        );
    }

    #[tokio::test]
    async fn conflicting_framing_headers() {
        let input =
            "POST /x HTTP/1.1\r\nContent-Length: 5\r\nTransfer-Encoding: chunked\r\n\r\nhello";
        assert_eq!(
            parse_whole(input).await.unwrap(),
            Err(ParseError::InvalidHeader)
        );
    }

    #[tokio::test]
    async fn unsupported_transfer_encodings() {
        #[rustfmt::skip]
        let cases = [
            "POST /x HTTP/1.1\r\nTransfer-Encoding: gzip\r\n\r\n",
            "POST /x HTTP/1.1\r\nTransfer-Encoding: gzip, chunked\r\n\r\n",
            "POST /x HTTP/1.1\r\nTransfer-Encoding: Chunked\r\n\r\n",
        ];

        for input in cases {
            assert_eq!(
                parse_whole(input).await.unwrap(),
                Err(ParseError::UnsupportedTransferEncoding),
                "{input:?}"
            );
        }
    }

    #[tokio::test]
    async fn chunked_body() {
        let input = "POST /u HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n\
                     5\r\nHello\r\n7\r\n, World\r\n0\r\n\r\n";
        let req = parse_whole(input).await.unwrap().unwrap();

        assert_eq!(req.body, b"Hello, World");
        assert!(req.trailers.is_empty());
    }

    #[tokio::test]
    async fn chunked_body_with_hex_sizes_and_trailers() {
        let input = "POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
                     A\r\n0123456789\r\n0\r\nX-Checksum: abc\r\n\r\n";
        let req = parse_whole(input).await.unwrap().unwrap();

        assert_eq!(req.body, b"0123456789");
        assert_eq!(req.trailers.get("x-checksum"), Some("abc"));
    }

    #[tokio::test]
    async fn invalid_chunked_bodies() {
        #[rustfmt::skip]
        let cases = [
            // Bad size line.
            "POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\ninvalid\r\nHello\r\n0\r\n\r\n",
            // Data not terminated by CRLF.
            "POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n5\r\nHelloXX2\r\nab\r\n0\r\n\r\n",
            // Empty size line.
            "POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\r\nHello\r\n0\r\n\r\n",
            // Size line longer than any plausible hex length.
            "POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n00000000000000000000000000000000005\r\nHello\r\n0\r\n\r\n",
        ];

        for input in cases {
            assert_eq!(
                parse_whole(input).await.unwrap(),
                Err(ParseError::InvalidChunkEncoding),
                "{input:?}"
            );
        }
    }

    #[tokio::test]
    async fn chunked_body_over_limit() {
        let limits = ServerLimits {
            max_body_size: 8,
            ..ServerLimits::default()
        };
        let input = "POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
                     5\r\nHello\r\n5\r\nWorld\r\n0\r\n\r\n";
        let mut parser = RequestParser::new(ChunkSource::whole(input), &limits);

        assert_eq!(
            parser.next().await.unwrap(),
            Err(ParseError::ContentTooLarge)
        );
    }

    #[tokio::test]
    async fn header_section_over_limit() {
        let limits = ServerLimits {
            max_header_size: 1024,
            ..ServerLimits::default()
        };

        let mut input = String::from("GET / HTTP/1.1\r\n");
        for i in 0..200 {
            input.push_str(&format!("H{i}: v\r\n"));
        }
        input.push_str("\r\n");

        let mut parser = RequestParser::new(ChunkSource::whole(&input), &limits);
        assert_eq!(parser.next().await.unwrap(), Err(ParseError::HeaderTooLarge));
    }

    #[tokio::test]
    async fn request_line_longer_than_budget() {
        let limits = ServerLimits {
            max_header_size: 64,
            ..ServerLimits::default()
        };
        let input = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(256));
        let mut parser = RequestParser::new(ChunkSource::whole(&input), &limits);

        assert_eq!(parser.next().await.unwrap(), Err(ParseError::HeaderTooLarge));
    }

    #[tokio::test]
    async fn crlf_flood_hits_header_budget() {
        let limits = ServerLimits {
            max_header_size: 64,
            ..ServerLimits::default()
        };
        let input = "\r\n".repeat(100);
        let mut parser = RequestParser::new(ChunkSource::whole(&input), &limits);

        assert_eq!(parser.next().await.unwrap(), Err(ParseError::HeaderTooLarge));
    }

    #[tokio::test]
    async fn byte_by_byte_feeding() {
        let input = "POST /submit HTTP/1.1\r\nHost: example.com\r\nContent-Length: 13\r\n\r\nHello, World!";
        let req = parse_byte_by_byte(input).await.unwrap().unwrap();

        assert_eq!(req.method, "POST");
        assert_eq!(req.uri.paths(), ["submit"]);
        assert_eq!(req.body, b"Hello, World!");
    }

    #[tokio::test]
    async fn byte_by_byte_chunked() {
        let input = "POST /u HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n\
                     5\r\nHello\r\n7\r\n, World\r\n0\r\n\r\n";
        let req = parse_byte_by_byte(input).await.unwrap().unwrap();

        assert_eq!(req.body, b"Hello, World");
    }

    #[tokio::test]
    async fn pipelined_requests_parse_in_order() {
        let input = "GET /first HTTP/1.1\r\n\r\n\
                     POST /second HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi\
                     GET /third HTTP/1.1\r\n\r\n";
        let mut parser = parser_for(input);

        let first = parser.next().await.unwrap().unwrap();
        assert_eq!(first.uri.paths(), ["first"]);

        let second = parser.next().await.unwrap().unwrap();
        assert_eq!(second.uri.paths(), ["second"]);
        assert_eq!(second.body, b"hi");

        let third = parser.next().await.unwrap().unwrap();
        assert_eq!(third.uri.paths(), ["third"]);

        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn pipelined_across_chunk_boundaries() {
        let source = ChunkSource::from_chunks(vec![
            b"GET /a HTTP/1.1\r\n\r\nGET /b HT".to_vec(),
            b"TP/1.1\r\n\r\n".to_vec(),
        ]);
        let mut parser = RequestParser::new(source, &ServerLimits::default());

        assert_eq!(parser.next().await.unwrap().unwrap().uri.paths(), ["a"]);
        assert_eq!(parser.next().await.unwrap().unwrap().uri.paths(), ["b"]);
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn crlf_between_pipelined_requests_is_skipped() {
        let input = "GET /a HTTP/1.1\r\n\r\n\r\n\r\nGET /b HTTP/1.1\r\n\r\n";
        let mut parser = parser_for(input);

        assert_eq!(parser.next().await.unwrap().unwrap().uri.paths(), ["a"]);
        assert_eq!(parser.next().await.unwrap().unwrap().uri.paths(), ["b"]);
        assert!(parser.next().await.is_none());
    }

    #[tokio::test]
    async fn close_mid_request_is_end_of_stream() {
        #[rustfmt::skip]
        let cases = [
            "",
            "GET /partial",
            "GET / HTTP/1.1\r\nHost: ex",
            "POST /x HTTP/1.1\r\nContent-Length: 10\r\n\r\nshort",
        ];

        for input in cases {
            assert!(parse_whole(input).await.is_none(), "{input:?}");
        }
    }

    #[tokio::test]
    async fn source_timeout_is_reader_closed() {
        let mut parser = RequestParser::new(StalledSource, &ServerLimits::default());

        assert_eq!(parser.next().await.unwrap(), Err(ParseError::ReaderClosed));
    }

    #[tokio::test]
    async fn cookies_extracted_from_request() {
        let input = "GET / HTTP/1.1\r\nCookie: session=abc ; theme=dark\r\nCookie: lang=en\r\n\r\n";
        let req = parse_whole(input).await.unwrap().unwrap();

        assert_eq!(req.cookie("session"), Some("abc"));
        assert_eq!(req.cookie("theme"), Some("dark"));
        assert_eq!(req.cookie("lang"), Some("en"));
    }

    #[tokio::test]
    async fn uri_query_reaches_request() {
        let req = parse_whole("GET /search?q=hello%20world&page=2 HTTP/1.1\r\n\r\n")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(req.query_param("q"), Some("hello world"));
        assert_eq!(req.query_param("page"), Some("2"));
    }

    #[tokio::test]
    async fn error_resets_parser_state() {
        let source = ChunkSource::from_chunks(vec![
            b"BAD LINE\r\n\r\n".to_vec(),
            b"GET /after HTTP/1.1\r\n\r\n".to_vec(),
        ]);
        let mut parser = RequestParser::new(source, &ServerLimits::default());

        assert!(parser.next().await.unwrap().is_err());
        // Buffer was cleared; the next call starts from fresh source
        // bytes rather than replaying the rejected ones.
        let req = parser.next().await.unwrap().unwrap();
        assert_eq!(req.uri.paths(), ["after"]);
    }

    #[tokio::test]
    async fn duplicate_content_length_uses_first() {
        let input = "POST /x HTTP/1.1\r\nContent-Length: 2\r\nContent-Length: 5\r\n\r\nhi";
        let req = parse_whole(input).await.unwrap().unwrap();

        assert_eq!(req.body, b"hi");
    }
}
