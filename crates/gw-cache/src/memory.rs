use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

pub const DEFAULT_MAX_SIZE: usize = 1000;
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct Entry {
    bytes: Vec<u8>,
    compressed: bool,
    expires_at: Instant,
}

/// Cumulative counters for the in-process tier, exposed through
/// `CacheManager::get_cache_info`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MemoryStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub size: usize,
    pub max_size: usize,
}

impl MemoryStats {
    pub fn utilization(&self) -> f64 {
        if self.max_size == 0 {
            0.0
        } else {
            self.size as f64 / self.max_size as f64
        }
    }
}

/// Bounded in-process cache tier: LRU eviction by entry count, lazy
/// expiration on access. Grounded in the teacher's `store.rs`/`eviction.rs`
/// shape, generalized to carry the byte payload + compression flag the
/// gateway's response cache needs rather than an arbitrary `V`.
pub struct MemoryTier {
    inner: Mutex<LruCache<String, Entry>>,
    default_ttl: Duration,
    max_size: usize,
    hits: std::sync::atomic::AtomicU64,
    misses: std::sync::atomic::AtomicU64,
    evictions: std::sync::atomic::AtomicU64,
    expirations: std::sync::atomic::AtomicU64,
}

impl MemoryTier {
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(max_size.max(1)).expect("max_size clamped to at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            default_ttl,
            max_size,
            hits: Default::default(),
            misses: Default::default(),
            evictions: Default::default(),
            expirations: Default::default(),
        }
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, bool)> {
        let mut inner = self.inner.lock();
        let hit = match inner.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                Some((entry.bytes.clone(), entry.compressed))
            }
            Some(_expired) => None,
            None => None,
        };

        match hit {
            Some(value) => {
                self.hits.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                Some(value)
            }
            None => {
                if inner.contains(key) {
                    inner.pop(key);
                    self.expirations.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                }
                self.misses.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                None
            }
        }
    }

    pub fn set(&self, key: String, bytes: Vec<u8>, compressed: bool, ttl: Option<Duration>) {
        let expires_at = Instant::now() + ttl.unwrap_or(self.default_ttl);
        let mut inner = self.inner.lock();
        let was_full = inner.len() >= self.max_size && !inner.contains(&key);
        inner.put(key, Entry { bytes, compressed, expires_at });
        if was_full {
            self.evictions.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        }
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.lock().pop(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn stats(&self) -> MemoryStats {
        use std::sync::atomic::Ordering::Relaxed;
        MemoryStats {
            hits: self.hits.load(Relaxed),
            misses: self.misses.load(Relaxed),
            evictions: self.evictions.load(Relaxed),
            expirations: self.expirations.load(Relaxed),
            size: self.inner.lock().len(),
            max_size: self.max_size,
        }
    }
}
