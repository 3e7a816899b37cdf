//! Store persisted to a JSON file.
//!
//! The whole map is held in memory and rewritten to disk after every
//! mutation (write to a sibling temp file, then rename over the target).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use super::{KeyValueStore, StoreError};

/// A store that survives restarts.
#[derive(Debug, Clone)]
pub struct FileStore {
    inner: Arc<DashMap<String, String>>,
    path: PathBuf,
    /// Serializes flushes so renames never interleave.
    flush_lock: Arc<Mutex<()>>,
}

impl FileStore {
    /// Open the store, loading existing entries if the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let inner = DashMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if !content.trim().is_empty() {
                let map: HashMap<String, String> = serde_json::from_str(&content)?;
                for (k, v) in map {
                    inner.insert(k, v);
                }
            }
            tracing::info!(path = %path.display(), entries = inner.len(), "Loaded store file");
        } else {
            tracing::info!(path = %path.display(), "Store file not found, starting empty");
        }

        Ok(Self {
            inner: Arc::new(inner),
            path,
            flush_lock: Arc::new(Mutex::new(())),
        })
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let _guard = self.flush_lock.lock().await;

        // Snapshot under the lock so the last flush always reflects the latest map.
        let map: HashMap<_, _> = self
            .inner
            .iter()
            .map(|r| (r.key().clone(), r.value().clone()))
            .collect();
        let content = serde_json::to_vec(&map)?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), entries = map.len(), "Store flushed");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.inner.get(key).map(|r| r.value().clone()))
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.inner.insert(key.to_string(), value);
        self.flush().await
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let existed = self.inner.remove(key).is_some();
        if existed {
            self.flush().await?;
        }
        Ok(existed)
    }
}
