//! HTTP status codes with the canonical reason-phrase table.

use std::fmt;

macro_rules! status_codes {
    ($(
        $(#[$docs:meta])*
        $name:ident = ($num:expr, $reason:expr);
    )+) => {
        impl StatusCode {
            $(
                $(#[$docs])*
                #[doc = concat!("`", stringify!($num), " ", $reason, "`")]
                pub const $name: StatusCode = StatusCode($num);
            )+

            /// Canonical reason phrase, if this code has one.
            ///
            /// Codes outside the table (valid but uncommon) have no
            /// phrase; the status line is emitted without one.
            pub const fn reason(self) -> Option<&'static str> {
                match self.0 {
                    $($num => Some($reason),)+
                    _ => None,
                }
            }
        }
    }
}

/// An HTTP status code in the range 100-599.
///
/// Any code in range can be constructed with [`StatusCode::from_u16`];
/// the common ones are available as associated constants.
///
/// # Examples
/// ```
/// use wharf::StatusCode;
///
/// assert_eq!(StatusCode::OK.code(), 200);
/// assert_eq!(StatusCode::OK.reason(), Some("OK"));
/// assert_eq!(StatusCode::from_u16(299).unwrap().reason(), None);
/// assert_eq!(StatusCode::from_u16(600), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

impl StatusCode {
    /// Builds a status code, rejecting anything outside 100-599.
    #[inline]
    pub const fn from_u16(code: u16) -> Option<StatusCode> {
        if code >= 100 && code <= 599 {
            Some(StatusCode(code))
        } else {
            None
        }
    }

    /// The numeric code.
    #[inline]
    pub const fn code(self) -> u16 {
        self.0
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{} {}", self.0, reason),
            None => write!(f, "{}", self.0),
        }
    }
}

status_codes! {
    CONTINUE = (100, "Continue");
    SWITCHING_PROTOCOLS = (101, "Switching Protocols");

    OK = (200, "OK");
    CREATED = (201, "Created");
    ACCEPTED = (202, "Accepted");
    NO_CONTENT = (204, "No Content");
    PARTIAL_CONTENT = (206, "Partial Content");

    MOVED_PERMANENTLY = (301, "Moved Permanently");
    FOUND = (302, "Found");
    SEE_OTHER = (303, "See Other");
    NOT_MODIFIED = (304, "Not Modified");
    TEMPORARY_REDIRECT = (307, "Temporary Redirect");
    PERMANENT_REDIRECT = (308, "Permanent Redirect");

    BAD_REQUEST = (400, "Bad Request");
    UNAUTHORIZED = (401, "Unauthorized");
    FORBIDDEN = (403, "Forbidden");
    NOT_FOUND = (404, "Not Found");
    METHOD_NOT_ALLOWED = (405, "Method Not Allowed");
    NOT_ACCEPTABLE = (406, "Not Acceptable");
    REQUEST_TIMEOUT = (408, "Request Timeout");
    CONFLICT = (409, "Conflict");
    GONE = (410, "Gone");
    LENGTH_REQUIRED = (411, "Length Required");
    PAYLOAD_TOO_LARGE = (413, "Payload Too Large");
    URI_TOO_LONG = (414, "URI Too Long");
    UNSUPPORTED_MEDIA_TYPE = (415, "Unsupported Media Type");
    RANGE_NOT_SATISFIABLE = (416, "Range Not Satisfiable");
    EXPECTATION_FAILED = (417, "Expectation Failed");
    UNPROCESSABLE_ENTITY = (422, "Unprocessable Entity");
    TOO_MANY_REQUESTS = (429, "Too Many Requests");

    INTERNAL_SERVER_ERROR = (500, "Internal Server Error");
    NOT_IMPLEMENTED = (501, "Not Implemented");
    BAD_GATEWAY = (502, "Bad Gateway");
    SERVICE_UNAVAILABLE = (503, "Service Unavailable");
    GATEWAY_TIMEOUT = (504, "Gateway Timeout");
    HTTP_VERSION_NOT_SUPPORTED = (505, "HTTP Version Not Supported");
}
