//! API cache pipeline.
//!
//! # Data Flow
//! ```text
//! API request
//!     → buffer body (bounded)
//!     → IdentityResolver (CacheKey | Forbidden)
//!     → OriginRequest (target URL, sanitized headers, body)
//!     → CacheCoordinator (spawned, so a client disconnect never cancels it)
//!     → CachedResponse | ApiError → sanitized response
//! ```

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::cache::{ApiError, CacheCoordinator, CachedResponse, IdentityResolver};
use crate::http::request::{rebase_url, request_id, request_id_layer, target_url};
use crate::observability::metrics;
use crate::origin::OriginRequest;
use crate::security::HeaderSanitizer;

/// Shared state of the API pipeline.
#[derive(Clone)]
pub struct ApiState {
    pub identity: Arc<IdentityResolver>,
    pub coordinator: Arc<CacheCoordinator>,
    pub sanitizer: HeaderSanitizer,
    pub request_id_header: HeaderName,
    pub upstream_base: Option<String>,
    pub max_body_size: usize,
}

/// Build the router that serves every intercepted API call.
pub fn api_router(state: ApiState) -> Router {
    let id_header = state.request_id_header.clone();
    let span_header = id_header.clone();

    Router::new()
        .fallback(api_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(move |req: &Request<Body>| {
            tracing::info_span!(
                "api",
                request_id = %request_id(req.headers(), &span_header),
                method = %req.method(),
                uri = %req.uri()
            )
        }))
        .layer(request_id_layer(id_header))
}

async fn api_handler(State(state): State<ApiState>, request: Request<Body>) -> Response {
    let uri = request.uri().clone();
    let result = handle_api(&state, request).await;

    match result {
        Ok(cached) => {
            metrics::record_api_request("ok");
            let mut response = cached.into_response();
            state.sanitizer.sanitize_in_place(response.headers_mut());
            response
        }
        Err(err) => {
            metrics::record_api_request(err.outcome());
            match &err {
                ApiError::Internal(detail) => {
                    tracing::error!(uri = %uri, error = %detail, "API request failed")
                }
                other => tracing::warn!(uri = %uri, outcome = other.outcome(), "API request refused"),
            }
            err.into_response()
        }
    }
}

async fn handle_api(state: &ApiState, request: Request<Body>) -> Result<CachedResponse, ApiError> {
    let (parts, body) = request.into_parts();
    let body = axum::body::to_bytes(body, state.max_body_size)
        .await
        .map_err(|e| ApiError::Internal(format!("reading request body: {e}")))?;

    let key = state.identity.resolve(&body, &parts.headers)?;

    let url = match &state.upstream_base {
        Some(base) => rebase_url(base, &parts.uri),
        None => target_url(&parts.uri, &parts.headers)
            .ok_or_else(|| ApiError::Internal("request target has no host".into()))?,
    };

    let origin_request = OriginRequest {
        method: parts.method,
        url,
        headers: state.sanitizer.sanitize(&parts.headers),
        body,
    };

    let coordinator = state.coordinator.clone();
    tokio::spawn(async move { coordinator.resolve(&key, origin_request).await })
        .await
        .map_err(|e| ApiError::Internal(format!("cache task failed: {e}")))?
}
