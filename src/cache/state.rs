//! Cache entry states and their stored envelope.
//!
//! # Stored Format
//! ```text
//! {"state":"pending"}
//! {"state":"blocked"}
//! {"state":"ready","status":200,"headers":[["content-type","application/json"]],"body":"eyJvayI6dHJ1ZX0="}
//! ```
//!
//! Header values that are not visible ASCII (obs-text) are stored as
//! `{"base64":"..."}` instead of a plain string so they survive unchanged.
//!
//! Interpretation is total: anything that does not decode cleanly is
//! `Blocked`, so a corrupt payload poisons the key instead of re-fetching.

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

/// A response as served from (or written to) the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// The semantic state of one cache key.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheState {
    /// No entry exists.
    Absent,
    /// A fetch is believed to be in flight.
    Pending,
    /// The last fetch failed, or the entry could not be decoded.
    Blocked,
    /// A stored origin response.
    Ready(CachedResponse),
}

impl CacheState {
    /// Interpret a raw store value.
    pub fn decode(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return CacheState::Absent;
        };

        match decode_envelope(raw) {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(error = %e, "Undecodable cache entry, treating as blocked");
                CacheState::Blocked
            }
        }
    }

    /// Encode for the store. `Absent` has no stored form.
    pub fn encode(&self) -> Result<Option<String>, serde_json::Error> {
        let envelope = match self {
            CacheState::Absent => return Ok(None),
            CacheState::Pending => Envelope::Pending,
            CacheState::Blocked => Envelope::Blocked,
            CacheState::Ready(response) => Envelope::Ready(StoredResponse::from_cached(response)),
        };
        serde_json::to_string(&envelope).map(Some)
    }

    /// Lowercase state name, matching the envelope tag.
    pub fn name(&self) -> &'static str {
        match self {
            CacheState::Absent => "absent",
            CacheState::Pending => "pending",
            CacheState::Blocked => "blocked",
            CacheState::Ready(_) => "ready",
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum DecodeError {
    #[error("malformed envelope: {0}")]
    Envelope(#[from] serde_json::Error),
    #[error("invalid status code {0}")]
    Status(u16),
    #[error("invalid header {0:?}")]
    Header(String),
    #[error("invalid body encoding: {0}")]
    Body(#[from] base64::DecodeError),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
enum Envelope {
    Pending,
    Blocked,
    Ready(StoredResponse),
}

#[derive(Serialize, Deserialize)]
struct StoredResponse {
    status: u16,
    headers: Vec<(String, StoredValue)>,
    body: String,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum StoredValue {
    Text(String),
    Binary { base64: String },
}

impl StoredValue {
    fn from_header(value: &HeaderValue) -> Self {
        match value.to_str() {
            Ok(text) => StoredValue::Text(text.to_string()),
            Err(_) => StoredValue::Binary {
                base64: STANDARD.encode(value.as_bytes()),
            },
        }
    }

    fn into_header(self) -> Option<HeaderValue> {
        match self {
            StoredValue::Text(text) => HeaderValue::from_str(&text).ok(),
            StoredValue::Binary { base64 } => {
                let bytes = STANDARD.decode(base64).ok()?;
                HeaderValue::from_bytes(&bytes).ok()
            }
        }
    }
}

impl StoredResponse {
    fn from_cached(response: &CachedResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), StoredValue::from_header(value)))
            .collect();

        Self {
            status: response.status.as_u16(),
            headers,
            body: STANDARD.encode(&response.body),
        }
    }

    fn into_cached(self) -> Result<CachedResponse, DecodeError> {
        let status = StatusCode::from_u16(self.status).map_err(|_| DecodeError::Status(self.status))?;

        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in self.headers {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| DecodeError::Header(name.clone()))?;
            let header_value = value.into_header().ok_or(DecodeError::Header(name))?;
            headers.append(header_name, header_value);
        }

        let body = STANDARD.decode(self.body)?;

        Ok(CachedResponse {
            status,
            headers,
            body: Bytes::from(body),
        })
    }
}

fn decode_envelope(raw: &str) -> Result<CacheState, DecodeError> {
    Ok(match serde_json::from_str::<Envelope>(raw)? {
        Envelope::Pending => CacheState::Pending,
        Envelope::Blocked => CacheState::Blocked,
        Envelope::Ready(stored) => CacheState::Ready(stored.into_cached()?),
    })
}
