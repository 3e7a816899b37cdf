//! Failure reasons of the API pipeline.

use crate::store::StoreError;

/// Every way an intercepted API call can fail.
///
/// Rendered to the client by `http::response`; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// Account or session token missing.
    #[error("request identity is missing")]
    Forbidden,
    /// Global flag set, or a fetch for the key is in flight.
    #[error("temporarily unavailable")]
    Unavailable,
    /// Key is blocked, its payload is corrupt, or its fetch failed.
    #[error("permanently unavailable")]
    Gone,
    /// Anything uncategorized.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Short label used in logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            ApiError::Forbidden => "forbidden",
            ApiError::Unavailable => "unavailable",
            ApiError::Gone => "gone",
            ApiError::Internal(_) => "internal",
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Internal(e.to_string())
    }
}
