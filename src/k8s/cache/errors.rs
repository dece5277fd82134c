/**
 * Errors raised by cache backends
 */
use thiserror::Error;

/// The cache backend was unreachable or rejected a command.
///
/// The read-through layer never surfaces this to callers: a failed read is a
/// miss and a failed write is logged and dropped.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("cache backend error: {0}")]
    Backend(String),
}
