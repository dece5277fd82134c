//! Shared key/value store used by the read-through cache
//!
//! A [`CacheBackend`] is the raw `GET`/`SETEX` protocol of one physical store.
//! [`CacheStore`] wraps a backend and scopes every key with a per-deployment
//! prefix, so independent installations sharing one Redis never read each
//! other's entries. The read-through layer only accepts a `CacheStore`.

use super::errors::CacheError;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch the raw value stored under `key`, `None` when absent or expired
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Store `value` under `key` for `ttl`
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;
}

/// Compute the key prefix for a deployment identity
#[must_use]
pub fn key_prefix(identity: &str) -> String {
    hex::encode(Sha256::digest(identity.as_bytes()))
}

/// Stable identity of the running deployment: `user/home` of the process
#[must_use]
pub fn default_identity() -> String {
    let user = std::env::var("USER").unwrap_or_default();
    let home = std::env::var("HOME").unwrap_or_default();
    format!("{user}/{home}")
}

/// A backend whose keys are scoped to one deployment
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl CacheStore {
    /// Scope `backend` by the prefix derived from `identity`
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>, identity: &str) -> Self {
        Self {
            backend,
            prefix: key_prefix(identity),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot be reached
    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.backend.get(&self.scoped(key)).await
    }

    /// # Errors
    ///
    /// Returns `CacheError` if the backend cannot be reached
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        self.backend.set(&self.scoped(key), value, ttl).await
    }
}
