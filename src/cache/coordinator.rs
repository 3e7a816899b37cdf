//! Read-through cache coordination.
//!
//! # State Transitions
//! ```text
//! Absent  → Pending → Ready(response)   origin answered (any status)
//! Absent  → Pending → Blocked           transport failure or timeout
//! Pending → (unchanged)                 caller told to retry later
//! Blocked → (unchanged)                 until cleared externally
//! Ready   → (unchanged)                 never expires
//! ```
//!
//! The read and the `Pending` write are not atomic. Two first requests for
//! the same key can both observe `Absent` and both fetch; the later write wins.

use std::sync::Arc;

use crate::cache::error::ApiError;
use crate::cache::identity::CacheKey;
use crate::cache::state::{CacheState, CachedResponse};
use crate::origin::{OriginFetcher, OriginRequest};
use crate::security::HeaderSanitizer;
use crate::store::{AvailabilityCheck, KeyValueStore};

/// Bytes of request body included in fetch failure logs.
const BODY_LOG_PREVIEW: usize = 512;

/// Decides, per cache key, between serving, refusing, and fetching.
#[derive(Clone)]
pub struct CacheCoordinator {
    store: Arc<dyn KeyValueStore>,
    availability: Arc<dyn AvailabilityCheck>,
    fetcher: Arc<dyn OriginFetcher>,
    sanitizer: HeaderSanitizer,
}

impl CacheCoordinator {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        availability: Arc<dyn AvailabilityCheck>,
        fetcher: Arc<dyn OriginFetcher>,
        sanitizer: HeaderSanitizer,
    ) -> Self {
        Self {
            store,
            availability,
            fetcher,
            sanitizer,
        }
    }

    /// Current state of `key` as stored.
    pub async fn state(&self, key: &str) -> Result<CacheState, ApiError> {
        let raw = self.store.get(key).await?;
        Ok(CacheState::decode(raw.as_deref()))
    }

    /// Resolve one API call for `key`.
    pub async fn resolve(&self, key: &CacheKey, request: OriginRequest) -> Result<CachedResponse, ApiError> {
        if !self.availability.is_available().await? {
            tracing::debug!(key = %key, "API globally unavailable");
            return Err(ApiError::Unavailable);
        }

        match self.state(key.as_str()).await? {
            CacheState::Ready(response) => {
                tracing::debug!(key = %key, status = %response.status, "Cache hit");
                Ok(response)
            }
            CacheState::Pending => {
                tracing::debug!(key = %key, "Fetch already in flight");
                Err(ApiError::Unavailable)
            }
            CacheState::Blocked => {
                tracing::debug!(key = %key, "Key is blocked");
                Err(ApiError::Gone)
            }
            CacheState::Absent => self.fetch_and_store(key, request).await,
        }
    }

    async fn fetch_and_store(&self, key: &CacheKey, request: OriginRequest) -> Result<CachedResponse, ApiError> {
        self.persist(key, &CacheState::Pending).await?;
        tracing::info!(key = %key, method = %request.method, url = %request.url, "Cache miss, fetching from origin");

        match self.fetcher.fetch(&request).await {
            Ok(origin) => {
                let response = CachedResponse {
                    status: origin.status,
                    headers: self.sanitizer.sanitize(&origin.headers),
                    body: origin.body,
                };
                if let Err(e) = self.persist(key, &CacheState::Ready(response.clone())).await {
                    self.leave_pending(key).await;
                    return Err(e);
                }
                tracing::info!(
                    key = %key,
                    status = %response.status,
                    body_len = response.body.len(),
                    "Origin response cached"
                );
                Ok(response)
            }
            Err(e) => {
                tracing::error!(
                    key = %key,
                    url = %request.url,
                    error = %e,
                    headers = ?request.headers,
                    body_len = request.body.len(),
                    body = %request.body_preview(BODY_LOG_PREVIEW),
                    "Origin fetch failed, blocking key"
                );
                self.persist(key, &CacheState::Blocked).await?;
                Err(ApiError::Gone)
            }
        }
    }

    /// Move `key` out of `Pending` after its final write failed.
    async fn leave_pending(&self, key: &CacheKey) {
        if self.persist(key, &CacheState::Blocked).await.is_err() {
            tracing::error!(key = %key, "Key left pending; clear it through the admin API");
        }
    }

    async fn persist(&self, key: &CacheKey, state: &CacheState) -> Result<(), ApiError> {
        let encoded = state
            .encode()
            .map_err(|e| ApiError::Internal(format!("encoding {} entry: {}", state.name(), e)))?;
        if let Some(value) = encoded {
            if let Err(e) = self.store.put(key.as_str(), value).await {
                tracing::error!(key = %key, state = state.name(), error = %e, "Store write failed");
                return Err(e.into());
            }
        }
        Ok(())
    }
}
