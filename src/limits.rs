//! Server configuration limits and timeouts
//!
//! # Security-First Defaults
//!
//! Default limits are intentionally conservative to prevent:
//! - Header flooding and slowloris-style trickle attacks
//! - Unbounded buffering of request bodies
//! - Connections parked forever mid-request
//!
//! # Examples
//!
//! ```no_run
//! use wharf::{Router, Server, ServerLimits};
//! use tokio::net::TcpListener;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     Server::builder()
//!         .listener(TcpListener::bind("127.0.0.1:8080").await.unwrap())
//!         .router(Router::new())
//!         .limits(ServerLimits {
//!             max_header_size: 8 * 1024,
//!             request_timeout: Duration::from_secs(10),
//!             ..ServerLimits::default()
//!         })
//!         .build()
//!         .launch()
//!         .await;
//! }
//! ```

use std::time::Duration;

/// Resource limits applied to every connection.
///
/// The parser buffer never grows past `max_header_size` before the body
/// and `max_body_size` for the decoded body, so per-connection memory
/// stays proportional to these two fields.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Hard cap on the bytes of request-line plus header lines,
    /// CRLFs included (default: 16 KiB).
    ///
    /// Exceeding the cap anywhere before the body - while parsing the
    /// request line, a header line, or while waiting for a line
    /// terminator that never arrives - rejects the request with
    /// `413 Payload Too Large` and closes the connection.
    pub max_header_size: usize,

    /// Hard cap on the decoded body length (default: 16 MiB).
    ///
    /// Applies to the `Content-Length` value before any body byte is
    /// read, and to the cumulative decoded size of a chunked body.
    pub max_body_size: usize,

    /// Per-request deadline (default: 30 s).
    ///
    /// Enforced twice: the socket byte source races every read against
    /// this deadline, and the connection driver races the whole
    /// `parser.next()` against it. Either firing shuts the
    /// connection down without a response.
    pub request_timeout: Duration,
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            max_header_size: 16 * 1024,
            max_body_size: 16 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let limits = ServerLimits::default();

        assert_eq!(limits.max_header_size, 16 * 1024);
        assert_eq!(limits.max_body_size, 16 * 1024 * 1024);
        assert_eq!(limits.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn struct_update_syntax() {
        let limits = ServerLimits {
            max_body_size: 1024,
            ..ServerLimits::default()
        };

        assert_eq!(limits.max_body_size, 1024);
        assert_eq!(limits.max_header_size, 16 * 1024);
    }
}
