//! Shared key-value store subsystem.
//!
//! # Data Flow
//! ```text
//! cache coordinator / availability check / operator API
//!     → KeyValueStore (opaque string values)
//!     → memory.rs (DashMap) or file.rs (DashMap + JSON file)
//! ```
//!
//! # Design Decisions
//! - Values are opaque strings; the cache layer owns their encoding
//! - No transactions or compare-and-set: callers live with last-write-wins
//! - Backends are chosen at startup from `StoreConfig`

pub mod availability;
pub mod file;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};

pub use availability::{AvailabilityCheck, StoreAvailabilityFlag};
pub use file::FileStore;
pub use memory::MemoryStore;

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store data is malformed: {0}")]
    Format(#[from] serde_json::Error),
    #[error("store is misconfigured: {0}")]
    Config(String),
}

/// Asynchronous string-to-string store shared by every request.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove `key`. Returns whether an entry existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
}

/// Build the configured store backend.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn KeyValueStore>, StoreError> {
    match config.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::File => {
            let path = config
                .path
                .as_deref()
                .ok_or_else(|| StoreError::Config("file backend requires store.path".into()))?;
            Ok(Arc::new(FileStore::open(path)?))
        }
    }
}
