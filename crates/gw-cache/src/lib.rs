//! Two-tier response cache: a bounded in-process LRU tier and an optional
//! Redis tier, with transparent compression and encryption-at-rest. See
//! SPEC_FULL.md §4.2.

mod compression;
mod encryption;
mod error;
mod key;
mod manager;
mod memory;
mod redis_tier;

pub use compression::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_COMPRESSION_THRESHOLD};
pub use encryption::CacheCipher;
pub use error::CacheError;
pub use key::build_key;
pub use manager::{
    default_ttl_for, CacheInfo, CacheManager, CacheManagerConfig, CacheType, HealthCheckReport,
};
pub use memory::{MemoryStats, MemoryTier, DEFAULT_MAX_SIZE, DEFAULT_TTL};
pub use redis_tier::{RedisTier, RedisTierConfig};
