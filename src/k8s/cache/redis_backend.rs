use super::errors::CacheError;
use super::store::CacheBackend;
use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Bound on opening a connection, including the manager's own retries
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);

/// Bound on a single command once connected
pub const RESPONSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A refused or silent Redis fails fast so lookups fall through to the cluster
fn manager_config() -> ConnectionManagerConfig {
    ConnectionManagerConfig::new()
        .set_connection_timeout(CONNECT_TIMEOUT)
        .set_response_timeout(RESPONSE_TIMEOUT)
        .set_number_of_retries(1)
        .set_factor(2)
        .set_max_delay(100)
}

/// Redis cache backend
///
/// The connection is opened on first use, so a Redis that is down at startup
/// only turns individual lookups into cache misses.
pub struct RedisBackend {
    client: redis::Client,
    connection: OnceCell<ConnectionManager>,
}

impl std::fmt::Debug for RedisBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBackend")
            .field("connected", &self.connection.initialized())
            .finish_non_exhaustive()
    }
}

impl RedisBackend {
    /// # Errors
    ///
    /// Returns `CacheError` if `url` is not a valid Redis connection URL
    pub fn new(url: &str) -> Result<Self, CacheError> {
        Ok(Self {
            client: redis::Client::open(url)?,
            connection: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, CacheError> {
        let open = self.connection.get_or_try_init(|| async {
            debug!("opening redis connection");
            self.client.get_connection_manager_with_config(manager_config()).await
        });
        let manager = tokio::time::timeout(CONNECT_TIMEOUT * 2, open)
            .await
            .map_err(|_| CacheError::Backend(format!("redis connect timed out after {:?}", CONNECT_TIMEOUT * 2)))??;
        Ok(manager.clone())
    }
}

/// Redis expiries are whole seconds; never round a live entry down to zero
fn ttl_secs(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut connection = self.connection().await?;
        Ok(connection.get::<_, Option<Vec<u8>>>(key).await?)
    }

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        let mut connection = self.connection().await?;
        connection
            .set_ex::<_, _, ()>(key, value, ttl_secs(ttl))
            .await?;
        Ok(())
    }
}
