//! Transparent forwarding for non-API HTTP traffic.
//!
//! # Responsibilities
//! - Resolve the target from the absolute-form URI or the Host header
//! - Forward method, path, sanitized headers and the streaming body
//! - Stream the origin response back with sanitized headers
//!
//! # Design Decisions
//! - No buffering and no caching on this path
//! - Upstream failures surface as errors so the connection is closed
//!   instead of answered with a synthesized page

use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, Response, Uri, Version};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::http::request::target_url;
use crate::observability::metrics;
use crate::security::HeaderSanitizer;

#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("request target has no host")]
    MissingHost,
    #[error("invalid target {0:?}")]
    InvalidTarget(String),
    #[error("upstream request failed: {0}")]
    Upstream(#[from] hyper_util::client::legacy::Error),
}

/// Relays plain HTTP requests to their origin.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    sanitizer: HeaderSanitizer,
}

impl Forwarder {
    pub fn new(connect_timeout: Duration, sanitizer: HeaderSanitizer) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(connect_timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, sanitizer }
    }

    pub async fn forward(&self, request: Request<Incoming>) -> Result<Response<Body>, ForwardError> {
        let (parts, body) = request.into_parts();

        let target = target_url(&parts.uri, &parts.headers).ok_or(ForwardError::MissingHost)?;
        let uri: Uri = target
            .parse()
            .map_err(|_| ForwardError::InvalidTarget(target.clone()))?;

        let mut outbound = Request::new(Body::new(body));
        *outbound.method_mut() = parts.method.clone();
        *outbound.uri_mut() = uri;
        *outbound.version_mut() = Version::HTTP_11;
        *outbound.headers_mut() = self.sanitizer.sanitize(&parts.headers);

        tracing::debug!(method = %parts.method, target = %target, "Forwarding request");

        let response = match self.client.request(outbound).await {
            Ok(response) => response,
            Err(e) => {
                metrics::record_forward("error");
                tracing::warn!(method = %parts.method, target = %target, error = %e, "Upstream error");
                return Err(e.into());
            }
        };
        metrics::record_forward("ok");

        let (mut parts, body) = response.into_parts();
        self.sanitizer.sanitize_in_place(&mut parts.headers);
        Ok(Response::from_parts(parts, Body::new(body)))
    }
}
