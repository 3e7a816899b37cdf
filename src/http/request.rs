//! Inbound request helpers.
//!
//! # Responsibilities
//! - Stamp a request ID on API calls for log correlation
//! - Resolve the absolute target URL of a proxied request
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - The request ID header is proxy-private and stripped on egress

use axum::http::{header, HeaderMap, HeaderName, Uri};
use tower_http::request_id::{MakeRequestUuid, SetRequestIdLayer};

/// Layer that assigns a UUID v4 under `header` when the request has none.
pub fn request_id_layer(header: HeaderName) -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(header, MakeRequestUuid)
}

/// Read the request ID for logging.
pub fn request_id<'a>(headers: &'a HeaderMap, header: &HeaderName) -> &'a str {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Absolute URL a proxied request targets.
///
/// Absolute-form targets are used as-is; origin-form targets are completed
/// from the Host header. `None` when no host can be determined.
pub fn target_url(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return Some(uri.to_string());
    }
    let host = headers.get(header::HOST)?.to_str().ok()?;
    if host.is_empty() {
        return None;
    }
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    Some(format!("http://{host}{path}"))
}

/// Rebase `uri` onto `base`, keeping path and query.
pub fn rebase_url(base: &str, uri: &Uri) -> String {
    let path = uri.path_and_query().map(|p| p.as_str()).unwrap_or("/");
    format!("{}{}", base.trim_end_matches('/'), path)
}
