//! Global availability check.
//!
//! A single flag, independent of any cache key, that turns every API call
//! into "try later". It lives in the shared store so an operator (or any
//! external process writing the store) can flip it.

use std::sync::Arc;

use async_trait::async_trait;

use super::{KeyValueStore, StoreError};

/// Answers whether the API namespace is currently serving.
#[async_trait]
pub trait AvailabilityCheck: Send + Sync {
    async fn is_available(&self) -> Result<bool, StoreError>;
}

/// Availability backed by a reserved key in the shared store.
///
/// The key holds a boolean-like string; a truthy value means the API is
/// unavailable. A missing key means available.
#[derive(Clone)]
pub struct StoreAvailabilityFlag {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl StoreAvailabilityFlag {
    pub fn new(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Set or clear the unavailable flag.
    pub async fn set_available(&self, available: bool) -> Result<(), StoreError> {
        let value = if available { "false" } else { "true" };
        self.store.put(&self.key, value.to_string()).await?;
        tracing::warn!(key = %self.key, available, "Availability flag updated");
        Ok(())
    }
}

#[async_trait]
impl AvailabilityCheck for StoreAvailabilityFlag {
    async fn is_available(&self) -> Result<bool, StoreError> {
        let flag = self.store.get(&self.key).await?;
        Ok(!flag.as_deref().map(is_truthy).unwrap_or(false))
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}
