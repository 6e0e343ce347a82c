use crate::error::CacheError;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::time::Duration;

/// Connection parameters for the Redis tier. See SPEC_FULL.md §4.2
/// "Redis tier specifics".
#[derive(Debug, Clone)]
pub struct RedisTierConfig {
    pub url: String,
    pub connect_timeout: Duration,
    pub command_timeout: Duration,
}

impl Default for RedisTierConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            command_timeout: Duration::from_secs(2),
        }
    }
}

/// The distributed cache tier. Redis failures are always degraded to a
/// miss by the caller (`CacheManager`); this module never panics or
/// retries on its own — retry/backoff belongs to `gw-resilience` when the
/// caller chooses to wrap it, not to the tier itself.
pub struct RedisTier {
    manager: ConnectionManager,
    command_timeout: Duration,
}

impl RedisTier {
    /// Establishes the connection. Fails fast at startup if the URL is
    /// malformed or the server is unreachable within `connect_timeout`; a
    /// transient outage after that point is handled per-command instead.
    pub async fn connect(config: &RedisTierConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.url.clone())
            .map_err(|e| CacheError::Configuration(format!("invalid redis url: {e}")))?;

        let manager = tokio::time::timeout(config.connect_timeout, client.get_connection_manager())
            .await
            .map_err(|_| CacheError::Infrastructure("redis connect timed out".to_string()))?
            .map_err(|e| CacheError::Infrastructure(format!("redis connect failed: {e}")))?;

        Ok(Self { manager, command_timeout: config.command_timeout })
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        let mut conn = self.manager.clone();
        let fut = async move { conn.get::<_, Option<Vec<u8>>>(key).await };
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| CacheError::Infrastructure("redis GET timed out".to_string()))?
            .map_err(|e| CacheError::Infrastructure(format!("redis GET failed: {e}")))
    }

    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let key = key.to_string();
        let value = value.to_vec();
        let ttl_secs = ttl.as_secs().max(1);
        let fut = async move { conn.set_ex::<_, _, ()>(key, value, ttl_secs).await };
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| CacheError::Infrastructure("redis SET timed out".to_string()))?
            .map_err(|e| CacheError::Infrastructure(format!("redis SET failed: {e}")))
    }

    pub async fn invalidate(&self, key: &str) -> Result<bool, CacheError> {
        let mut conn = self.manager.clone();
        let fut = async move { conn.del::<_, i64>(key).await };
        let deleted = tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| CacheError::Infrastructure("redis DEL timed out".to_string()))?
            .map_err(|e| CacheError::Infrastructure(format!("redis DEL failed: {e}")))?;
        Ok(deleted > 0)
    }

    /// Lightweight liveness probe for `CacheManager::health_check`.
    pub async fn ping(&self) -> Result<(), CacheError> {
        let mut conn = self.manager.clone();
        let fut = async move { redis::cmd("PING").query_async::<String>(&mut conn).await };
        tokio::time::timeout(self.command_timeout, fut)
            .await
            .map_err(|_| CacheError::Infrastructure("redis PING timed out".to_string()))?
            .map_err(|e| CacheError::Infrastructure(format!("redis PING failed: {e}")))?;
        Ok(())
    }
}
