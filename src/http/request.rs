//! The fully framed request value handed to handlers.

use crate::http::headers::HeaderMap;
use crate::http::uri::Uri;
use std::collections::HashMap;

/// One framed HTTP/1.1 request.
///
/// All storage is owned: the parser buffer a request was framed from is
/// free to be reused for the next pipelined request the moment this
/// value is produced.
///
/// `path_params` and `wildcard_path` start empty; the router fills them
/// from the winning pattern exactly once, before any middleware runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    /// Request method, an RFC 9110 token (`GET`, `POST`, ...).
    pub method: String,
    /// Parsed request target.
    pub uri: Uri,
    /// Header section.
    pub headers: HeaderMap,
    /// Trailer section; populated only after a chunked body.
    pub trailers: HeaderMap,
    /// Body bytes; empty when the request carried none.
    pub body: Vec<u8>,
    /// Cookie pairs aggregated from every `Cookie` header.
    pub cookies: HashMap<String, String>,
    /// `:name` captures from the matched route pattern.
    pub path_params: HashMap<String, String>,
    /// The remainder captured by a trailing `*` segment, joined with
    /// `/`, no leading or trailing slash. Empty without a wildcard.
    pub wildcard_path: String,
}

impl Request {
    /// Builds a request with the given method and target. Used by the
    /// parser and handy for driving a [`Router`](crate::Router)
    /// directly in tests.
    pub fn new(method: impl Into<String>, uri: Uri) -> Self {
        Request {
            method: method.into(),
            uri,
            ..Request::default()
        }
    }

    /// First value of a header, case-insensitive.
    #[inline]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// A cookie by name.
    #[inline]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// First value of a query parameter.
    #[inline]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.uri.query_param(key)
    }

    /// A path parameter captured by the matched pattern.
    #[inline]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Splits every `Cookie` header into `name=value` pairs.
    ///
    /// Pairs are separated by `;`, surrounding SP/HTAB is trimmed on
    /// each pair, and the pair splits on its first `=`. Pairs without
    /// `=` are dropped; a name seen twice keeps the later value.
    pub(crate) fn extract_cookies(headers: &HeaderMap) -> HashMap<String, String> {
        let mut cookies = HashMap::new();

        for value in headers.get_all("Cookie") {
            for pair in value.split(';') {
                let pair = pair.trim_matches(|c| c == ' ' || c == '\t');
                if let Some((name, value)) = pair.split_once('=') {
                    if !name.is_empty() {
                        cookies.insert(name.to_string(), value.to_string());
                    }
                }
            }
        }

        cookies
    }
}
