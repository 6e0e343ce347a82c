use crate::compression::{compress, decompress, should_compress, DEFAULT_COMPRESSION_LEVEL, DEFAULT_COMPRESSION_THRESHOLD};
use crate::encryption::CacheCipher;
use crate::error::CacheError;
use crate::memory::{MemoryStats, MemoryTier, DEFAULT_MAX_SIZE, DEFAULT_TTL};
use crate::redis_tier::{RedisTier, RedisTierConfig};
use gw_core::Operation;
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const HEALTH_CHECK_KEY: &str = "_health_check_test";
const HEALTH_CHECK_TTL: Duration = Duration::from_secs(10);

/// Default TTLs per operation. Caller-supplied TTL overrides these; `0` or
/// negative means "do not cache". See SPEC_FULL.md §4.2 "TTL policy".
pub fn default_ttl_for(operation: Operation) -> Duration {
    match operation {
        Operation::Summarize => Duration::from_secs(7200),
        Operation::Sentiment => Duration::from_secs(86400),
        Operation::KeyPoints => Duration::from_secs(7200),
        Operation::Questions => Duration::from_secs(3600),
        Operation::Qa => Duration::from_secs(1800),
    }
}

/// Which tier is actually backing the cache, for health reporting and
/// introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    RedisSecure,
    Memory,
}

/// Config consumed at `CacheManager::connect` time.
pub struct CacheManagerConfig {
    pub memory_max_size: usize,
    pub memory_default_ttl: Duration,
    pub compression_threshold: usize,
    pub compression_level: u32,
    pub redis: Option<RedisTierConfig>,
    /// Required to activate the Redis tier in secure mode; absence with a
    /// Redis URL configured falls back to memory-only (§4.2 "Tier
    /// selection at init").
    pub encryption_key: Option<[u8; 32]>,
}

impl Default for CacheManagerConfig {
    fn default() -> Self {
        Self {
            memory_max_size: DEFAULT_MAX_SIZE,
            memory_default_ttl: DEFAULT_TTL,
            compression_threshold: DEFAULT_COMPRESSION_THRESHOLD,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            redis: None,
            encryption_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthCheckReport {
    pub healthy: bool,
    pub cache_type: CacheType,
    pub errors: Vec<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheInfo {
    pub cache_type: CacheType,
    pub security_enabled: bool,
    pub initialized: bool,
    pub stats: MemoryStats,
    pub encryption_active: Option<bool>,
    pub connection_secure: Option<bool>,
    pub connection_scheme: Option<String>,
}

struct RedisState {
    tier: RedisTier,
    cipher: CacheCipher,
    scheme_secure: bool,
}

/// Unified two-tier cache. Tier selection happens once, at `connect()`
/// time; thereafter every `get`/`set`/`delete` transparently prefers
/// Redis when connected and falls back to memory on any Redis failure.
/// Grounded in `original_source`'s `CacheManager`, carried through the
/// teacher's `CacheStore`/`eviction.rs` shape for the memory tier.
pub struct CacheManager {
    memory: MemoryTier,
    redis: tokio::sync::RwLock<Option<RedisState>>,
    compression_threshold: usize,
    compression_level: u32,
    initialized: std::sync::atomic::AtomicBool,
}

impl CacheManager {
    pub fn new(config: &CacheManagerConfig) -> Self {
        Self {
            memory: MemoryTier::new(config.memory_max_size, config.memory_default_ttl),
            redis: tokio::sync::RwLock::new(None),
            compression_threshold: config.compression_threshold,
            compression_level: config.compression_level,
            initialized: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Idempotent. Attempts the Redis tier if configured; on any failure,
    /// logs and proceeds memory-only rather than raising (§4.2 "never
    /// raise during init in a non-strict mode").
    pub async fn connect(&self, config: &CacheManagerConfig) {
        if self.initialized.load(std::sync::atomic::Ordering::Acquire) {
            return;
        }

        if let Some(redis_config) = &config.redis {
            let cipher = match config.encryption_key {
                Some(key) => CacheCipher::new(&key).ok(),
                None => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("redis tier requested but no encryption key configured, staying memory-only");
                    None
                }
            };

            if let Some(cipher) = cipher {
                match RedisTier::connect(redis_config).await {
                    Ok(tier) => {
                        let scheme_secure = redis_config.url.starts_with("rediss://");
                        let mut guard = self.redis.write().await;
                        *guard = Some(RedisState { tier, cipher, scheme_secure });
                        #[cfg(feature = "tracing")]
                        tracing::info!("cache connected to redis tier");
                    }
                    Err(err) => {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(error = %err, "redis connect failed, falling back to memory-only");
                    }
                }
            }
        }

        self.initialized.store(true, std::sync::atomic::Ordering::Release);
    }

    /// Idempotent. Releases the Redis connection manager if one exists.
    pub async fn disconnect(&self) {
        let mut guard = self.redis.write().await;
        *guard = None;
    }

    fn is_redis_active(&self) -> bool {
        self.redis.try_read().map(|g| g.is_some()).unwrap_or(false)
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        if let Some((bytes, compressed)) = self.memory.get(key) {
            let plain = if compressed { decompress(&bytes)? } else { bytes };
            return Ok(Some(plain));
        }

        let guard = self.redis.read().await;
        if let Some(state) = guard.as_ref() {
            match state.tier.get(key).await {
                Ok(Some(encrypted)) => {
                    let framed = state.cipher.decrypt(&encrypted)?;
                    let (header, body) = framed.split_first().ok_or_else(|| {
                        CacheError::Infrastructure("redis value missing compression header".to_string())
                    })?;
                    let plain = if *header == 1 { decompress(body)? } else { body.to_vec() };
                    return Ok(Some(plain));
                }
                Ok(None) => return Ok(None),
                Err(_err) => return Ok(None),
            }
        }

        Ok(None)
    }

    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> Result<(), CacheError> {
        if ttl.is_zero() {
            return Ok(());
        }

        let compressed = should_compress(value, self.compression_threshold);
        let payload = if compressed { compress(value, self.compression_level)? } else { value.to_vec() };

        self.memory.set(key.to_string(), payload.clone(), compressed, Some(ttl));

        let guard = self.redis.read().await;
        if let Some(state) = guard.as_ref() {
            // A single header byte records whether `payload` was
            // compressed, so `get` can reverse the pipeline without
            // guessing (the compressed flag never leaves this process
            // otherwise).
            let mut framed = Vec::with_capacity(payload.len() + 1);
            framed.push(compressed as u8);
            framed.extend_from_slice(&payload);
            let encrypted = state.cipher.encrypt(&framed)?;
            let _ = state.tier.set(key, &encrypted, ttl).await;
        }

        Ok(())
    }

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let memory_hit = self.memory.invalidate(key);
        let guard = self.redis.read().await;
        let redis_hit = match guard.as_ref() {
            Some(state) => state.tier.invalidate(key).await.unwrap_or(false),
            None => false,
        };
        Ok(memory_hit || redis_hit)
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.get(key).await?.is_some())
    }

    pub fn clear(&self) {
        self.memory.clear();
    }

    pub fn cache_type(&self) -> CacheType {
        if self.is_redis_active() {
            CacheType::RedisSecure
        } else {
            CacheType::Memory
        }
    }

    /// Round-trips a known key through the active tier to verify
    /// write/read/delete all function. See SPEC_FULL.md §4.2.
    pub async fn health_check(&self) -> HealthCheckReport {
        let mut errors = Vec::new();
        let probe = b"ok".to_vec();

        if let Err(e) = self.set(HEALTH_CHECK_KEY, &probe, HEALTH_CHECK_TTL).await {
            errors.push(format!("write failed: {e}"));
        }

        match self.get(HEALTH_CHECK_KEY).await {
            Ok(Some(value)) if value == probe => {}
            Ok(Some(_)) => errors.push("read returned unexpected value".to_string()),
            Ok(None) => errors.push("read returned no value".to_string()),
            Err(e) => errors.push(format!("read failed: {e}")),
        }

        if let Err(e) = self.delete(HEALTH_CHECK_KEY).await {
            errors.push(format!("delete failed: {e}"));
        }

        HealthCheckReport {
            healthy: errors.is_empty(),
            cache_type: self.cache_type(),
            errors,
            timestamp: now_unix(),
        }
    }

    /// Cheap synchronous snapshot of configuration and counters, distinct
    /// from `health_check` (§4.2 "Introspection").
    pub fn get_cache_info(&self) -> CacheInfo {
        let redis_active = self.is_redis_active();
        let (encryption_active, connection_secure, connection_scheme) = if redis_active {
            let guard = self.redis.try_read();
            let secure = guard.as_ref().and_then(|g| g.as_ref()).map(|s| s.scheme_secure);
            (Some(true), secure, secure.map(|s| if s { "rediss".to_string() } else { "redis".to_string() }))
        } else {
            (None, None, None)
        };

        CacheInfo {
            cache_type: self.cache_type(),
            security_enabled: redis_active,
            initialized: self.initialized.load(std::sync::atomic::Ordering::Acquire),
            stats: self.memory.stats(),
            encryption_active,
            connection_secure,
            connection_scheme,
        }
    }
}

fn now_unix() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_only_set_then_get_round_trips() {
        let manager = CacheManager::new(&CacheManagerConfig::default());
        manager.set("k", b"value", Duration::from_secs(60)).await.unwrap();
        assert_eq!(manager.get("k").await.unwrap(), Some(b"value".to_vec()));
    }

    #[tokio::test]
    async fn zero_ttl_means_do_not_cache() {
        let manager = CacheManager::new(&CacheManagerConfig::default());
        manager.set("k", b"value", Duration::ZERO).await.unwrap();
        assert_eq!(manager.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let manager = CacheManager::new(&CacheManagerConfig::default());
        manager.set("k", b"value", Duration::from_secs(60)).await.unwrap();
        assert!(manager.delete("k").await.unwrap());
        assert_eq!(manager.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn cache_type_is_memory_without_redis_config() {
        let manager = CacheManager::new(&CacheManagerConfig::default());
        manager.connect(&CacheManagerConfig::default()).await;
        assert_eq!(manager.cache_type(), CacheType::Memory);
        assert!(!manager.get_cache_info().security_enabled);
    }

    #[tokio::test]
    async fn health_check_reports_healthy_for_memory_tier() {
        let manager = CacheManager::new(&CacheManagerConfig::default());
        let report = manager.health_check().await;
        assert!(report.healthy, "errors: {:?}", report.errors);
        assert_eq!(report.cache_type, CacheType::Memory);
    }

    #[test]
    fn ttl_table_matches_documented_defaults() {
        assert_eq!(default_ttl_for(Operation::Summarize), Duration::from_secs(7200));
        assert_eq!(default_ttl_for(Operation::Sentiment), Duration::from_secs(86400));
        assert_eq!(default_ttl_for(Operation::KeyPoints), Duration::from_secs(7200));
        assert_eq!(default_ttl_for(Operation::Questions), Duration::from_secs(3600));
        assert_eq!(default_ttl_for(Operation::Qa), Duration::from_secs(1800));
    }

    #[tokio::test]
    async fn large_values_compress_transparently() {
        let manager = CacheManager::new(&CacheManagerConfig::default());
        let value = vec![b'x'; 5000];
        manager.set("big", &value, Duration::from_secs(60)).await.unwrap();
        assert_eq!(manager.get("big").await.unwrap(), Some(value));
    }
}
