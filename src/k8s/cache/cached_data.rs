use std::time::{Duration, Instant};

/// A stored value together with its absolute expiry
#[derive(Debug, Clone)]
pub struct CachedData<T> {
    pub data: T,
    pub expires_at: Instant,
}

impl<T> CachedData<T> {
    pub fn new(data: T, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
