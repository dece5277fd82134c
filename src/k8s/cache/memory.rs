use super::cached_data::CachedData;
use super::errors::CacheError;
use super::store::CacheBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// In-process cache backend with per-entry expiry
///
/// Used for single-process runs without Redis and as the store in tests.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Arc<RwLock<HashMap<String, CachedData<Vec<u8>>>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until purged
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop every expired entry, returning how many were removed
    ///
    /// Runs on every write, so entries that are never read again do not pile up.
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }
}

#[async_trait]
impl CacheBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.data.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        debug!("memory backend: dropping expired entry {}", key);
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(CachedData::is_expired) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let purged = self.purge_expired().await;
        if purged > 0 {
            debug!("memory backend: purged {} expired entries", purged);
        }
        self.entries
            .write()
            .await
            .insert(key.to_string(), CachedData::new(value, ttl));
        Ok(())
    }
}
