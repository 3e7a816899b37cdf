//! Outbound HTTP calls to the API origin.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};

use crate::observability::metrics;

/// Everything needed to replay an intercepted call against the origin.
#[derive(Debug, Clone)]
pub struct OriginRequest {
    pub method: Method,
    /// Absolute URL.
    pub url: String,
    /// Already sanitized.
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl OriginRequest {
    /// Lossy UTF-8 prefix of the body, for diagnostics.
    pub fn body_preview(&self, max: usize) -> String {
        let end = self.body.len().min(max);
        String::from_utf8_lossy(&self.body[..end]).into_owned()
    }
}

/// What the origin answered, whatever the status.
#[derive(Debug, Clone)]
pub struct OriginResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level failures. An HTTP error status is not a `FetchError`.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("origin did not respond within {0:?}")]
    Timeout(Duration),
    #[error("origin request failed: {0}")]
    Transport(String),
}

/// Performs a single origin call.
#[async_trait]
pub trait OriginFetcher: Send + Sync {
    async fn fetch(&self, request: &OriginRequest) -> Result<OriginResponse, FetchError>;
}

/// Origin fetcher backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestOriginFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestOriginFetcher {
    pub fn new(connect_timeout: Duration, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            // The proxy must never route its own origin calls through a proxy.
            .no_proxy()
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    fn classify(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl OriginFetcher for ReqwestOriginFetcher {
    async fn fetch(&self, request: &OriginRequest) -> Result<OriginResponse, FetchError> {
        let start = Instant::now();

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if !request.body.is_empty() {
            builder = builder.body(request.body.clone());
        }

        let result = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(OriginResponse { status, headers, body })
        }
        .await
        .map_err(|e| self.classify(e));

        let label = match &result {
            Ok(_) => "ok",
            Err(FetchError::Timeout(_)) => "timeout",
            Err(FetchError::Transport(_)) => "error",
        };
        metrics::record_origin_fetch(label, start);

        result
    }
}
