use super::key::CacheKey;
use super::store::CacheStore;
use crate::error::Result;
use k8s_openapi::serde_json;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Whether a call may be answered from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lookup {
    /// Answer from the cache when an entry is present
    #[default]
    Cached,
    /// Always fetch fresh and overwrite the cached entry
    Purge,
}

impl Lookup {
    #[must_use]
    pub const fn from_purge(purge: bool) -> Self {
        if purge { Self::Purge } else { Self::Cached }
    }
}

/// Read-through cache over a prefixed [`CacheStore`]
#[derive(Debug, Clone)]
pub struct ResourceCache {
    store: CacheStore,
}

impl ResourceCache {
    #[must_use]
    pub const fn new(store: CacheStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result
    ///
    /// With [`Lookup::Purge`] the cache is not consulted. A successful fetch is
    /// stored whole for `ttl`. Cache backend failures are logged and treated
    /// as a miss (reads) or dropped (writes).
    ///
    /// # Errors
    ///
    /// Returns whatever `fetch` returns; failed fetches are never cached.
    pub async fn read_through<T, F, Fut>(
        &self,
        key: &CacheKey,
        ttl: Duration,
        lookup: Lookup,
        fetch: F,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let key = key.to_string();

        if lookup == Lookup::Cached {
            if let Some(value) = self.lookup::<T>(&key).await {
                return Ok(value);
            }
        } else {
            debug!("cache purge: {}", key);
        }

        let value = fetch().await?;
        self.store_value(&key, &value, ttl).await;
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => {
                    debug!("cache hit: {}", key);
                    Some(value)
                }
                Err(e) => {
                    warn!("cache entry {} could not be decoded, refetching: {}", key, e);
                    None
                }
            },
            Ok(None) => {
                debug!("cache miss: {}", key);
                None
            }
            Err(e) => {
                warn!("cache read failed for {}, treating as miss: {}", key, e);
                None
            }
        }
    }

    async fn store_value<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("value for {} could not be encoded, not caching: {}", key, e);
                return;
            }
        };
        let size = bytes.len();
        match self.store.set(key, bytes, ttl).await {
            Ok(()) => info!("cache store: {} ({}KB, ttl {}s)", key, size / 1024, ttl.as_secs()),
            Err(e) => warn!("cache write failed for {}: {}", key, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::k8s::cache::{CacheBackend, CacheError, MemoryBackend};
    use async_trait::async_trait;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> (ResourceCache, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let store = CacheStore::new(backend.clone(), "test/home/test");
        (ResourceCache::new(store), backend)
    }

    /// Backend that refuses every read, and every write unless `accept_writes` is set
    #[derive(Default)]
    struct DownBackend {
        accept_writes: bool,
        writes: AtomicUsize,
    }

    #[async_trait]
    impl CacheBackend for DownBackend {
        async fn get(&self, _key: &str) -> std::result::Result<Option<Vec<u8>>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn set(&self, _key: &str, _value: Vec<u8>, _ttl: Duration) -> std::result::Result<(), CacheError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.accept_writes {
                return Ok(());
            }
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    #[test]
    fn test_lookup_from_purge() {
        assert_eq!(Lookup::from_purge(true), Lookup::Purge);
        assert_eq!(Lookup::from_purge(false), Lookup::Cached);
        assert_eq!(Lookup::default(), Lookup::Cached);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let (cache, _) = cache();
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let key = CacheKey::new("numbers");
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1, 2, 3])
        };

        let first: Vec<i32> = cache.read_through(&key, Duration::from_secs(60), Lookup::Cached, fetch).await.unwrap();
        let second: Vec<i32> = cache.read_through(&key, Duration::from_secs(60), Lookup::Cached, fetch).await.unwrap();

        assert_eq!(first, vec![1, 2, 3]);
        assert_eq!(second, first);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_purge_refetches_and_overwrites() {
        let (cache, _) = cache();
        let key = CacheKey::new("version");
        let ttl = Duration::from_secs(60);

        let v: u32 = cache.read_through(&key, ttl, Lookup::Cached, || async { Ok(1) }).await.unwrap();
        assert_eq!(v, 1);
        let v: u32 = cache.read_through(&key, ttl, Lookup::Purge, || async { Ok(2) }).await.unwrap();
        assert_eq!(v, 2);
        let v: u32 = cache.read_through(&key, ttl, Lookup::Cached, || async { Ok(3) }).await.unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn test_entry_is_refetched_after_ttl() {
        let (cache, _) = cache();
        let key = CacheKey::new("short");
        let ttl = Duration::from_millis(30);

        let v: u32 = cache.read_through(&key, ttl, Lookup::Cached, || async { Ok(1) }).await.unwrap();
        assert_eq!(v, 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        let v: u32 = cache.read_through(&key, ttl, Lookup::Cached, || async { Ok(2) }).await.unwrap();
        assert_eq!(v, 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_not_cached() {
        let (cache, backend) = cache();
        let key = CacheKey::new("broken");
        let ttl = Duration::from_secs(60);

        let result: Result<u32> = cache
            .read_through(&key, ttl, Lookup::Cached, || async { Err(Error::Custom("boom".to_string())) })
            .await;
        assert!(result.is_err());
        assert!(backend.is_empty().await);

        let v: u32 = cache.read_through(&key, ttl, Lookup::Cached, || async { Ok(7) }).await.unwrap();
        assert_eq!(v, 7);
    }

    #[tokio::test]
    async fn test_empty_collection_is_a_hit() {
        let (cache, _) = cache();
        let key = CacheKey::new("empty");
        let ttl = Duration::from_secs(60);

        let v: Vec<String> = cache.read_through(&key, ttl, Lookup::Cached, || async { Ok(Vec::new()) }).await.unwrap();
        assert!(v.is_empty());
        let v: Vec<String> = cache
            .read_through(&key, ttl, Lookup::Cached, || async { Ok(vec!["refetched".to_string()]) })
            .await
            .unwrap();
        assert!(v.is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_falls_through_to_fetch() {
        let backend = Arc::new(DownBackend::default());
        let cache = ResourceCache::new(CacheStore::new(backend.clone(), "test/home/test"));
        let key = CacheKey::new("namespaces");
        let counter = AtomicUsize::new(0);
        let calls = &counter;
        let fetch = move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok("fresh".to_string())
        };

        let v: String = cache.read_through(&key, Duration::from_secs(60), Lookup::Cached, fetch).await.unwrap();
        assert_eq!(v, "fresh");
        let v: String = cache.read_through(&key, Duration::from_secs(60), Lookup::Cached, fetch).await.unwrap();
        assert_eq!(v, "fresh");
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        // Every fetch still tries to store its result
        assert_eq!(backend.writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreadable_backend_still_stores_fetched_values() {
        let backend = Arc::new(DownBackend {
            accept_writes: true,
            ..DownBackend::default()
        });
        let cache = ResourceCache::new(CacheStore::new(backend.clone(), "test/home/test"));
        let key = CacheKey::new("nodes");

        for _ in 0..3 {
            let v: Vec<String> = cache
                .read_through(&key, Duration::from_secs(60), Lookup::Cached, || async {
                    Ok(vec!["tools-k8s-worker-1".to_string()])
                })
                .await
                .unwrap();
            assert_eq!(v, vec!["tools-k8s-worker-1"]);
        }
        assert_eq!(backend.writes.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_refetched() {
        let (cache, _) = cache();
        let key = CacheKey::new("shape");
        cache
            .store()
            .set(&key.to_string(), b"not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        let v: u32 = cache
            .read_through(&key, Duration::from_secs(60), Lookup::Cached, || async { Ok(5) })
            .await
            .unwrap();
        assert_eq!(v, 5);
    }
}
