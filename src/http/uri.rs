//! Request-target parsing and pattern matching.
//!
//! A [`Uri`] is an ordered list of percent-decoded path segments plus an
//! ordered list of percent-decoded query pairs. The same type carries
//! both request targets and route patterns; patterns may hold `:name`
//! parameter segments and a single trailing `*` wildcard.

use std::fmt;

/// How well two URIs match each other.
///
/// Ordering follows dispatch priority: an exact hit beats a parameter
/// capture, which beats a wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UriMatch {
    NoMatch,
    /// Matched through a trailing `*`, e.g. `/files/*` against
    /// `/files/a/b`.
    WildMatch,
    /// Matched through one or more `:name` segments on one side only.
    ParamMatch,
    /// Segment-for-segment agreement (including two patterns whose
    /// parameter positions coincide).
    FullMatch,
}

/// A parsed request target or route pattern.
///
/// # Examples
/// ```
/// use wharf::Uri;
///
/// let uri = Uri::parse("/api/v1/users?active=true").unwrap();
/// assert_eq!(uri.paths(), ["api", "v1", "users"]);
/// assert_eq!(uri.query_param("active"), Some("true"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Uri {
    paths: Vec<String>,
    query: Vec<(String, String)>,
}

impl Uri {
    /// Parses a request target.
    ///
    /// The input is split once on the first `?`. The path must start
    /// with `/`; it is split on `/` (empty segments collapse, so `/`,
    /// `/a/` and `//a` normalize) and each segment is percent-decoded
    /// *after* splitting - decoding first would let an encoded `/`
    /// inside a segment corrupt the split. A `*` segment is only legal
    /// in final position. Query pairs split on `&` then on the first
    /// `=`; a key with no `=` gets an empty value. Any malformed `%HH`
    /// sequence fails the whole parse.
    pub fn parse(input: &str) -> Option<Uri> {
        let (path, query) = match input.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (input, None),
        };

        if !path.starts_with('/') {
            return None;
        }

        let mut paths = Vec::new();
        for segment in path.split('/') {
            if segment.is_empty() {
                continue;
            }
            paths.push(percent_decode(segment)?);
        }
        for (index, segment) in paths.iter().enumerate() {
            if segment == "*" && index + 1 != paths.len() {
                return None;
            }
        }

        let mut pairs = Vec::new();
        if let Some(query) = query {
            for pair in query.split('&') {
                if pair.is_empty() {
                    continue;
                }
                let (key, value) = match pair.split_once('=') {
                    Some((key, value)) => (key, value),
                    None => (pair, ""),
                };
                pairs.push((percent_decode(key)?, percent_decode(value)?));
            }
        }

        Some(Uri {
            paths,
            query: pairs,
        })
    }

    /// Decoded path segments in order. Empty for `/`.
    #[inline]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Decoded query pairs in order.
    #[inline]
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// First value for a query key, case-sensitive.
    #[inline]
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The path component without the query, e.g. `/api/users`.
    pub fn path(&self) -> String {
        if self.paths.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.paths {
            out.push('/');
            out.push_str(segment);
        }
        out
    }

    /// Classifies how this URI matches `other`. Symmetric.
    ///
    /// Positions are walked pairwise: a `*` on either side wins
    /// immediately (the shared prefix before it already agreed); a
    /// literal disagreement is absorbed by a `:name` segment on either
    /// side or fails the match. Unequal lengths only survive when they
    /// differ by one and the longer side ends with `*` - that is how
    /// `/files/*` matches `/files` itself.
    ///
    /// # Examples
    /// ```
    /// use wharf::{Uri, UriMatch};
    ///
    /// let pattern = Uri::parse("/users/:id").unwrap();
    /// let request = Uri::parse("/users/42").unwrap();
    /// assert_eq!(pattern.matches(&request), UriMatch::ParamMatch);
    ///
    /// let wild = Uri::parse("/users/*").unwrap();
    /// assert_eq!(wild.matches(&request), UriMatch::WildMatch);
    /// assert_eq!(request.matches(&request), UriMatch::FullMatch);
    /// ```
    pub fn matches(&self, other: &Uri) -> UriMatch {
        let a = &self.paths;
        let b = &other.paths;

        let mut param_a = false;
        let mut param_b = false;

        for (sa, sb) in a.iter().zip(b.iter()) {
            if sa == "*" || sb == "*" {
                return UriMatch::WildMatch;
            }
            if sa == sb {
                continue;
            }
            let pa = sa.starts_with(':');
            let pb = sb.starts_with(':');
            if !pa && !pb {
                return UriMatch::NoMatch;
            }
            param_a |= pa;
            param_b |= pb;
        }

        if a.len() != b.len() {
            if a.len().abs_diff(b.len()) == 1 {
                let longer = if a.len() > b.len() { a } else { b };
                if longer.last().map(String::as_str) == Some("*") {
                    return UriMatch::WildMatch;
                }
            }
            return UriMatch::NoMatch;
        }

        match (param_a, param_b) {
            (true, false) | (false, true) => UriMatch::ParamMatch,
            _ => UriMatch::FullMatch,
        }
    }
}

impl fmt::Display for Uri {
    /// Formats the URI so that `Uri::parse` round-trips it, including
    /// `:name` and `*` pattern segments. Only structural characters
    /// (`%`, `/`, `?`, `&`, `=`, `#`, `+`, space, controls) are
    /// re-encoded.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.paths.is_empty() {
            f.write_str("/")?;
        }
        for segment in &self.paths {
            write!(f, "/{}", DisplayEncoded(segment))?;
        }
        for (index, (key, value)) in self.query.iter().enumerate() {
            let sep = if index == 0 { '?' } else { '&' };
            write!(f, "{sep}{}={}", DisplayEncoded(key), DisplayEncoded(value))?;
        }
        Ok(())
    }
}

struct DisplayEncoded<'a>(&'a str);

impl fmt::Display for DisplayEncoded<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            let structural = ch.is_ascii()
                && (matches!(ch, '%' | '/' | '?' | '&' | '=' | '#' | '+' | ' ')
                    || ch.is_ascii_control());
            if structural {
                write!(f, "%{:02X}", ch as u8)?;
            } else {
                write!(f, "{ch}")?;
            }
        }
        Ok(())
    }
}

/// Decodes `%HH` sequences (either hex case). Returns `None` on any
/// malformed sequence or if the decoded bytes are not valid UTF-8.
pub fn percent_decode(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = hex_value(*bytes.get(i + 1)?)?;
            let lo = hex_value(*bytes.get(i + 2)?)?;
            out.push(hi << 4 | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).ok()
}

/// Encodes every byte outside the RFC 3986 unreserved set
/// (ALPHA / DIGIT / `-` `.` `_` `~`) as `%HH` with uppercase hex.
pub fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for &byte in input.as_bytes() {
        let unreserved =
            byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~');
        if unreserved {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}




#[cfg(test)]
mod percent_tests {
    use super::*;

    #[test]
    fn decode_valid() {
        #[rustfmt::skip]
        let cases = [
            ("hello%20world",        "hello world"),
            ("hello%20world%21%40%23", "hello world!@#"),
            ("test%2A%2B%2C",        "test*+,"),
            ("test%2a%2b%2c",        "test*+,"),
            ("test%2A%2b%2C",        "test*+,"),
            ("hello world",          "hello world"),
            ("",                     ""),
            ("%48%65%6C%6C%6F",      "Hello"),
            ("name%3DJohn%26age%3D25", "name=John&age=25"),
            ("%C3%A9%C3%A0%C3%A8",   "éàè"),
        ];

        for (input, expected) in cases {
            assert_eq!(percent_decode(input).as_deref(), Some(expected), "{input:?}");
        }
    }

    #[test]
    fn decode_invalid() {
        #[rustfmt::skip]
        let cases = [
            "hello%2",
            "hello%2world",
            "hello%G0world",
            "hello%2Gworld",
            "hello%GGworld",
            "hello%",
            "test%ZZ%YY",
            "%FF",           // lone 0xFF is not UTF-8
        ];

        for input in cases {
            assert_eq!(percent_decode(input), None, "{input:?}");
        }
    }

    #[test]
    fn encode_basics() {
        #[rustfmt::skip]
        let cases = [
            ("hello world",       "hello%20world"),
            ("name=John&age=25",  "name%3DJohn%26age%3D25"),
            ("",                  ""),
            ("abc123-_.~",        "abc123-_.~"),
            ("!*'();:@&=+$,/?#[]",
             "%21%2A%27%28%29%3B%3A%40%26%3D%2B%24%2C%2F%3F%23%5B%5D"),
            ("café",              "caf%C3%A9"),
        ];

        for (input, expected) in cases {
            assert_eq!(percent_encode(input), expected, "{input:?}");
        }
    }

    #[test]
    fn encode_decode_round_trip() {
        let cases = ["hello world!@#$%^&*()", "café naïve résumé", ""];

        for input in cases {
            assert_eq!(
                percent_decode(&percent_encode(input)).as_deref(),
                Some(input)
            );
        }
    }
}
