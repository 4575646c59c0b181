//! Response cache with LRU eviction and per-entry TTL.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use curbside_types::{SharedClock, SystemClock};
use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::config::CacheConfig;
use crate::entry::CacheEntry;

/// Result of a staleness-aware read.
#[derive(Debug, Clone, PartialEq)]
pub struct StaleRead<V> {
    /// Cached value.
    pub value: V,

    /// Whether the value is past its stale horizon (but not expired).
    pub is_stale: bool,
}

/// Inner state protected by the cache mutex.
pub(crate) struct CacheInner<V> {
    /// Entries in access order, most recent first.
    pub(crate) lru: LruCache<String, CacheEntry<V>>,

    pub(crate) hits: u64,
    pub(crate) misses: u64,
    pub(crate) evictions: u64,

    /// Source of revalidation tokens.
    pub(crate) next_token: u64,

    /// Keys with a background revalidation in flight, mapped to its token.
    /// Invalidating a key drops its token so the late result is discarded.
    pub(crate) revalidating: HashMap<String, u64>,
}

impl<V> CacheInner<V> {
    /// Insert or overwrite, evicting the least recently used entry first
    /// when a new key would exceed `max_size`.
    pub(crate) fn insert(&mut self, key: &str, entry: CacheEntry<V>, max_size: usize) {
        if !self.lru.contains(key) && self.lru.len() >= max_size {
            if let Some((evicted, _)) = self.lru.pop_lru() {
                self.evictions += 1;
                debug!(key = %evicted, "Evicting LRU entry to make room");
            }
        }
        self.lru.put(key.to_string(), entry);
    }
}

/// Bounded in-memory cache with TTL expiry, LRU eviction and hit/miss
/// accounting.
///
/// All primitives are synchronous and hold the lock for their full
/// duration, so each one is atomic from the caller's point of view. The
/// read strategies (`with_cache`, `with_swr`, `prefetch`) are built on top
/// and never hold the lock across an await.
///
/// Among entries with equal `last_accessed`, the one touched least recently
/// is evicted first; for entries never read that is insertion order.
///
/// Cloning yields another handle to the same store.
pub struct MemoryCache<V> {
    pub(crate) inner: Arc<Mutex<CacheInner<V>>>,
    pub(crate) config: CacheConfig,
    pub(crate) clock: SharedClock,
}

impl<V: Clone> MemoryCache<V> {
    /// Create a cache driven by the system clock.
    pub fn new(config: CacheConfig) -> Self {
        Self::with_clock(config, SystemClock::shared())
    }

    /// Create a cache driven by the given clock.
    pub fn with_clock(mut config: CacheConfig, clock: SharedClock) -> Self {
        config.max_size = config.max_size.max(1);
        // The store enforces max_size itself; the LRU list is only an ordering.
        let inner = CacheInner {
            lru: LruCache::unbounded(),
            hits: 0,
            misses: 0,
            evictions: 0,
            next_token: 0,
            revalidating: HashMap::new(),
        };

        Self {
            inner: Arc::new(Mutex::new(inner)),
            config,
            clock,
        }
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub(crate) fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    /// Look up a value.
    ///
    /// Expired entries are removed and reported as a miss. A hit refreshes
    /// the entry's `last_accessed` and LRU position.
    pub fn get(&self, key: &str) -> Option<V> {
        self.read(key).map(|read| read.value)
    }

    /// Look up a value and report whether it is past its stale horizon.
    ///
    /// Stale entries are still returned; only expired ones are dropped.
    pub fn get_stale(&self, key: &str) -> Option<StaleRead<V>> {
        self.read(key)
    }

    fn read(&self, key: &str) -> Option<StaleRead<V>> {
        let now = self.now_ms();
        let mut inner = self.inner.lock();

        let expired = inner.lru.peek(key).map(|entry| entry.is_expired(now));
        match expired {
            None => {
                inner.misses += 1;
                trace!(key = %key, "Cache miss");
                None
            }
            Some(true) => {
                inner.lru.pop(key);
                inner.misses += 1;
                debug!(key = %key, "Cache entry expired, removing");
                None
            }
            Some(false) => {
                inner.hits += 1;
                let entry = inner.lru.get_mut(key)?;
                entry.touch(now);
                trace!(key = %key, "Cache hit");
                Some(StaleRead {
                    value: entry.data.clone(),
                    is_stale: entry.is_stale(now),
                })
            }
        }
    }

    /// Store a value, overwriting any existing entry at `key`.
    ///
    /// If a new key would exceed `max_size`, the least recently used entry
    /// is evicted first.
    pub fn set(&self, key: &str, value: V, ttl: Duration, stale_after: Option<Duration>) {
        let now = self.now_ms();
        let entry = CacheEntry::new(value, now, ttl, stale_after);
        let mut inner = self.inner.lock();
        inner.insert(key, entry, self.config.max_size);

        trace!(
            key = %key,
            ttl_ms = ttl.as_millis() as u64,
            cache_size = inner.lru.len(),
            "Cache entry stored"
        );
    }

    /// Store a value with the configured default TTL.
    pub fn set_default(&self, key: &str, value: V) {
        self.set(key, value, self.config.default_ttl, None);
    }

    /// Remove one entry. Returns whether it existed.
    pub fn delete(&self, key: &str) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.lru.pop(key).is_some();
        inner.revalidating.remove(key);
        if removed {
            debug!(key = %key, "Cache entry invalidated");
        }
        removed
    }

    /// Remove every entry whose key contains `pattern`.
    pub fn delete_pattern(&self, pattern: &str) -> usize {
        let mut inner = self.inner.lock();
        let matching: Vec<String> = inner
            .lru
            .iter()
            .filter(|(key, _)| key.contains(pattern))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &matching {
            inner.lru.pop(key);
            inner.revalidating.remove(key);
        }

        if !matching.is_empty() {
            debug!(pattern = %pattern, count = matching.len(), "Cache entries invalidated by pattern");
        }

        matching.len()
    }

    /// Sweep all expired entries. Returns the number removed.
    pub fn cleanup(&self) -> usize {
        let now = self.now_ms();
        let mut inner = self.inner.lock();
        let expired: Vec<String> = inner
            .lru
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            inner.lru.pop(key);
        }

        if !expired.is_empty() {
            debug!(count = expired.len(), "Cleaned up expired cache entries");
        }

        expired.len()
    }

    /// Empty the store and reset the counters.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.lru.clear();
        inner.hits = 0;
        inner.misses = 0;
        inner.evictions = 0;
        inner.revalidating.clear();
        debug!("Cache cleared");
    }

    /// Whether a non-expired entry exists. Does not touch counters or LRU order.
    pub fn has(&self, key: &str) -> bool {
        let now = self.now_ms();
        let inner = self.inner.lock();
        inner
            .lru
            .peek(key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Remaining life of an entry, `None` if absent or expired.
    pub fn ttl_remaining(&self, key: &str) -> Option<Duration> {
        let now = self.now_ms();
        let inner = self.inner.lock();
        inner.lru.peek(key).and_then(|entry| entry.remaining(now))
    }

    /// Peek at an entry without updating LRU order or counters.
    pub fn peek_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        let now = self.now_ms();
        let inner = self.inner.lock();
        inner
            .lru
            .peek(key)
            .filter(|entry| !entry.is_expired(now))
            .cloned()
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.hits + inner.misses;
        let hit_rate = if total == 0 {
            0.0
        } else {
            inner.hits as f64 / total as f64 * 100.0
        };

        CacheStats {
            size: inner.lru.len(),
            capacity: self.config.max_size,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            hit_rate,
            keys: inner.lru.iter().map(|(key, _)| key.clone()).collect(),
        }
    }
}

impl<V> Clone for MemoryCache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
            clock: Arc::clone(&self.clock),
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Current number of entries.
    pub size: usize,

    /// Maximum capacity.
    pub capacity: usize,

    pub hits: u64,
    pub misses: u64,

    /// Entries removed to make room for new keys.
    pub evictions: u64,

    /// Hit percentage in `0.0..=100.0`; zero before any access.
    pub hit_rate: f64,

    /// Stored keys, most recently used first.
    pub keys: Vec<String>,
}
