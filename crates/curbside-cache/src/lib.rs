//! In-memory response cache with TTL, LRU eviction and stale-while-revalidate.
//!
//! Used to avoid redundant calls to slow or rate-limited data sources:
//! - Bounded size with LRU eviction
//! - Per-entry TTL, expired lazily on read or swept by `cleanup()`
//! - Hit/miss accounting
//! - Read-through (`with_cache`), stale-while-revalidate (`with_swr`) and
//!   `prefetch` strategies
//!
//! # Example
//!
//! ```rust,ignore
//! use curbside_cache::{CacheConfig, CacheKey, MemoryCache, ttl};
//!
//! let cache = MemoryCache::new(CacheConfig::default().with_max_size(200));
//! let key = CacheKey::new("schedules").part(zone_id).to_string();
//! let schedule = cache.with_cache(&key, || api.schedule(zone_id), ttl::MEDIUM).await?;
//! ```

mod cache;
mod cleanup;
mod config;
mod entry;
mod error;
mod keys;
mod strategy;

pub use cache::{CacheStats, MemoryCache, StaleRead};
pub use cleanup::{CleanupTask, spawn_cleanup_task};
pub use config::{CacheConfig, DEFAULT_MAX_SIZE};
pub use entry::CacheEntry;
pub use error::{Error, Result};
pub use keys::{CacheKey, SEPARATOR, ttl, ttl_by_name};
pub use strategy::{RevalidateCallback, SwrOptions};
