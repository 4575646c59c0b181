//! Cache entries and their expiry arithmetic.

use std::time::Duration;

use curbside_types::duration_ms;

/// Entry stored in the cache.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub data: V,

    /// When the value was stored or last refreshed (epoch ms).
    pub stored_at: u64,

    /// Absolute expiry horizon measured from `stored_at`.
    pub ttl: Duration,

    /// Optional earlier horizon after which the value is stale but usable.
    pub stale_after: Option<Duration>,

    /// Last successful read (epoch ms). Drives LRU eviction.
    pub last_accessed: u64,
}

impl<V> CacheEntry<V> {
    /// Create an entry stored at `now_ms`.
    pub fn new(data: V, now_ms: u64, ttl: Duration, stale_after: Option<Duration>) -> Self {
        Self {
            data,
            stored_at: now_ms,
            ttl,
            stale_after,
            last_accessed: now_ms,
        }
    }

    /// Milliseconds since the entry was stored.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stored_at)
    }

    /// An entry is expired once its age strictly exceeds the TTL.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.age_ms(now_ms) > duration_ms(self.ttl)
    }

    /// Stale once the age exceeds the stale horizon, or the TTL when none is set.
    pub fn is_stale(&self, now_ms: u64) -> bool {
        let horizon = self.stale_after.unwrap_or(self.ttl);
        self.age_ms(now_ms) > duration_ms(horizon)
    }

    /// Remaining life before expiry, `None` once expired.
    pub fn remaining(&self, now_ms: u64) -> Option<Duration> {
        if self.is_expired(now_ms) {
            return None;
        }
        let left = duration_ms(self.ttl).saturating_sub(self.age_ms(now_ms));
        Some(Duration::from_millis(left))
    }

    pub(crate) fn touch(&mut self, now_ms: u64) {
        self.last_accessed = now_ms;
    }
}
