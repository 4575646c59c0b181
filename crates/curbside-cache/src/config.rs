//! Configuration for the response cache.

use std::time::Duration;

use curbside_types::{HasCacheConfig, config_defaults as defaults};

/// Default maximum number of cached responses.
pub const DEFAULT_MAX_SIZE: usize = defaults::CACHE_MAX_SIZE;

/// Configuration for the response cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of entries before LRU eviction.
    pub max_size: usize,

    /// TTL used by [`crate::MemoryCache::set_default`].
    pub default_ttl: Duration,

    /// Whether to run periodic cleanup of expired entries.
    /// If false, expired entries are only removed on access or by `cleanup()`.
    pub enable_cleanup_task: bool,

    /// Interval for the cleanup task (if enabled).
    pub cleanup_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            default_ttl: defaults::cache_default_ttl(),
            enable_cleanup_task: true,
            cleanup_interval: defaults::cache_cleanup_interval(),
        }
    }
}

impl CacheConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any type carrying cache settings.
    pub fn from_provider<C: HasCacheConfig>(provider: &C) -> Self {
        Self {
            max_size: provider.max_size(),
            default_ttl: provider.default_ttl(),
            enable_cleanup_task: provider.cleanup_task_enabled(),
            cleanup_interval: provider.cleanup_interval(),
        }
    }

    /// Set the maximum number of entries. Zero is treated as one.
    pub fn with_max_size(mut self, max: usize) -> Self {
        self.max_size = max.max(1);
        self
    }

    /// Set the default TTL.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Enable or disable the background cleanup task.
    pub fn with_cleanup_task(mut self, enabled: bool) -> Self {
        self.enable_cleanup_task = enabled;
        self
    }

    /// Set the cleanup interval.
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curbside_types::CacheConfigProvider;

    #[test]
    fn test_builder() {
        let config = CacheConfig::new()
            .with_max_size(0)
            .with_default_ttl(Duration::from_secs(5))
            .with_cleanup_task(false);
        assert_eq!(config.max_size, 1);
        assert_eq!(config.default_ttl, Duration::from_secs(5));
        assert!(!config.enable_cleanup_task);
    }

    #[test]
    fn test_from_provider() {
        let provider = CacheConfigProvider {
            max_size: 42,
            default_ttl: Duration::from_secs(90),
            cleanup_interval: Duration::from_secs(30),
            cleanup_task_enabled: false,
        };
        let config = CacheConfig::from_provider(&provider);
        assert_eq!(config.max_size, 42);
        assert_eq!(config.default_ttl, Duration::from_secs(90));
        assert_eq!(config.cleanup_interval, Duration::from_secs(30));
        assert!(!config.enable_cleanup_task);
    }
}
