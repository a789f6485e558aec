use crate::http::status::StatusCode;
use crate::http::uri::Uri;
use thiserror::Error;

/// Typed failures produced while framing a request from the byte stream.
///
/// Every variant terminates the current request and leaves the parser
/// reset; the connection driver answers with a single status response
/// and closes the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The byte source failed (timeout or unknown I/O error) while a
    /// request was in flight. No response is sent for this one; the
    /// peer is gone or stalled.
    #[error("byte source closed or failed mid-request")]
    ReaderClosed,

    /// Request line violated `METHOD SP URI SP HTTP/1.1 CRLF`.
    #[error("malformed request line")]
    InvalidRequestLine,

    /// A header line violated `name \":\" OWS value OWS CRLF`, or the
    /// framing headers conflict (`Content-Length` together with
    /// `Transfer-Encoding`), or `Content-Length` is not a base-10
    /// integer.
    #[error("malformed header field")]
    InvalidHeader,

    /// `Transfer-Encoding` carried any coding other than exactly
    /// `chunked`.
    #[error("unsupported transfer encoding")]
    UnsupportedTransferEncoding,

    /// The declared or decoded body length exceeds the configured
    /// maximum body size.
    #[error("request body exceeds the configured limit")]
    ContentTooLarge,

    /// Request line plus header lines exceed the configured maximum
    /// header size.
    #[error("header section exceeds the configured limit")]
    HeaderTooLarge,

    /// A chunk-size line was not valid hex, or chunk data was not
    /// terminated by CRLF.
    #[error("malformed chunked encoding")]
    InvalidChunkEncoding,
}

impl ParseError {
    /// Status code the driver answers with before closing.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ParseError::UnsupportedTransferEncoding => StatusCode::NOT_IMPLEMENTED,
            ParseError::ContentTooLarge | ParseError::HeaderTooLarge => {
                StatusCode::PAYLOAD_TOO_LARGE
            }
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Route registration failures.
///
/// Both variants are deliberately fatal at startup: a router that
/// silently dropped or shadowed a route would mis-dispatch in
/// production.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouterError {
    /// The pattern did not parse as a URI, or carried a query string.
    #[error("invalid route pattern: '{0}'")]
    InvalidUri(String),

    /// The new registration overlaps an existing one: the patterns
    /// FULL_MATCH each other and either bind the same method or both
    /// act as the catch-all handler for any method.
    #[error("route collision between '{new}' and '{existing}'")]
    Collision { new: Uri, existing: Uri },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_status_codes() {
        #[rustfmt::skip]
        let cases = [
            (ParseError::ReaderClosed,               400),
            (ParseError::InvalidRequestLine,         400),
            (ParseError::InvalidHeader,              400),
            (ParseError::UnsupportedTransferEncoding, 501),
            (ParseError::ContentTooLarge,            413),
            (ParseError::HeaderTooLarge,             413),
            (ParseError::InvalidChunkEncoding,       400),
        ];

        for (err, code) in cases {
            assert_eq!(err.status_code().code(), code, "{err:?}");
        }
    }

    #[test]
    fn collision_message_names_both_patterns() {
        let err = RouterError::Collision {
            new: Uri::parse("/users/:id").unwrap(),
            existing: Uri::parse("/users/:userId").unwrap(),
        };

        let text = err.to_string();
        assert!(text.contains("/users/:id"));
        assert!(text.contains("/users/:userId"));
    }
}
