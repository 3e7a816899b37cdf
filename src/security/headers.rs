//! Header sanitization.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers (RFC 9110 §7.6.1)
//! - Strip proxy-private headers (session token, request identifier)
//! - Strip headers the outbound client recomputes (`host`, `content-length`)
//!
//! # Design Decisions
//! - Applied on every egress: requests to origins and responses to clients
//! - Matching is case-insensitive (`HeaderName` is always lowercase)
//! - Headers listed in an inbound `Connection` value are treated as hop-by-hop

use axum::http::header::{self, HeaderMap, HeaderName};

/// Headers removed regardless of configuration.
static ALWAYS_STRIPPED: [HeaderName; 6] = [
    header::CONNECTION,
    HeaderName::from_static("proxy-connection"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::HOST,
    header::CONTENT_LENGTH,
];

/// Removes hop-by-hop and proxy-private headers from header maps.
#[derive(Debug, Clone)]
pub struct HeaderSanitizer {
    private: Vec<HeaderName>,
}

impl HeaderSanitizer {
    /// Build a sanitizer that additionally strips the given private headers.
    pub fn new(session_header: HeaderName, request_id_header: HeaderName) -> Self {
        Self {
            private: vec![session_header, request_id_header],
        }
    }

    /// Return a sanitized copy of `headers`.
    pub fn sanitize(&self, headers: &HeaderMap) -> HeaderMap {
        let mut out = headers.clone();
        self.sanitize_in_place(&mut out);
        out
    }

    /// Strip headers from `headers` without copying.
    pub fn sanitize_in_place(&self, headers: &mut HeaderMap) {
        // Names nominated by the Connection header are only meaningful on this hop.
        let nominated: Vec<HeaderName> = headers
            .get_all(header::CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
            .collect();

        for name in ALWAYS_STRIPPED.iter().chain(&self.private).chain(&nominated) {
            headers.remove(name);
        }
    }
}

impl Default for HeaderSanitizer {
    fn default() -> Self {
        Self::new(
            HeaderName::from_static("cache-token"),
            HeaderName::from_static("x-request-id"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (k, v) in pairs {
            map.append(HeaderName::from_static(k), HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn strips_hop_by_hop_and_private_headers() {
        let input = headers(&[
            ("connection", "keep-alive"),
            ("proxy-connection", "keep-alive"),
            ("proxy-authenticate", "Basic"),
            ("proxy-authorization", "Basic Zm9v"),
            ("host", "game.example"),
            ("content-length", "12"),
            ("cache-token", "t1"),
            ("x-request-id", "abc"),
            ("content-type", "application/json"),
            ("set-cookie", "a=1"),
            ("set-cookie", "b=2"),
        ]);

        let out = HeaderSanitizer::default().sanitize(&input);

        assert_eq!(out.len(), 3);
        assert_eq!(out["content-type"], "application/json");
        assert_eq!(out.get_all("set-cookie").iter().count(), 2);
        // the input is left untouched
        assert_eq!(input.len(), 11);
    }

    #[test]
    fn strips_mixed_case_names() {
        let mut input = HeaderMap::new();
        input.insert(
            HeaderName::from_bytes(b"Proxy-Connection").unwrap(),
            HeaderValue::from_static("close"),
        );
        input.insert(
            HeaderName::from_bytes(b"Cache-Token").unwrap(),
            HeaderValue::from_static("t1"),
        );
        assert!(HeaderSanitizer::default().sanitize(&input).is_empty());
    }

    #[test]
    fn strips_headers_nominated_by_connection() {
        let input = headers(&[
            ("connection", "keep-alive, x-hop"),
            ("keep-alive", "timeout=5"),
            ("x-hop", "1"),
            ("accept", "*/*"),
        ]);
        let out = HeaderSanitizer::default().sanitize(&input);
        assert_eq!(out.len(), 1);
        assert!(out.contains_key("accept"));
    }

    #[test]
    fn custom_private_headers() {
        let sanitizer = HeaderSanitizer::new(
            HeaderName::from_static("x-session"),
            HeaderName::from_static("x-trace"),
        );
        let out = sanitizer.sanitize(&headers(&[
            ("x-session", "s"),
            ("x-trace", "t"),
            ("cache-token", "kept"),
        ]));
        assert_eq!(out.len(), 1);
        assert_eq!(out["cache-token"], "kept");
    }
}
