//! Configuration traits for decoupled config passing between crates.
//!
//! The cache and session crates depend on these capabilities instead of the
//! full configuration file model, so they stay usable as standalone
//! libraries.

use std::time::Duration;

/// Base trait for all configuration types.
///
/// Implementations should be cheaply cloneable and thread-safe.
pub trait ConfigProvider: Clone + Send + Sync + 'static {}

/// Response cache configuration.
pub trait HasCacheConfig: ConfigProvider {
    /// Maximum number of entries before LRU eviction.
    fn max_size(&self) -> usize;

    /// TTL applied by callers that do not pick one explicitly.
    fn default_ttl(&self) -> Duration;

    /// Interval between background sweeps of expired entries.
    fn cleanup_interval(&self) -> Duration;

    /// Whether a background sweep task should be started.
    fn cleanup_task_enabled(&self) -> bool {
        true
    }
}

/// Idle-timeout configuration for the session activity monitor.
pub trait HasSessionConfig: ConfigProvider {
    /// Idle horizon after which the user is signed out.
    fn idle_timeout(&self) -> Duration;

    /// How long before the timeout the warning fires.
    fn warning_lead(&self) -> Duration;

    /// Minimum interval between persisted activity updates.
    fn activity_throttle(&self) -> Duration;

    /// Interval of the periodic state check.
    fn check_interval(&self) -> Duration {
        defaults::check_interval()
    }

    /// Key under which the last activity timestamp is persisted.
    fn storage_key(&self) -> String {
        defaults::STORAGE_KEY.to_string()
    }

    /// Login entry point used for the timeout redirect.
    fn login_path(&self) -> String {
        defaults::LOGIN_PATH.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Default values
// ─────────────────────────────────────────────────────────────────────────────

/// Default configuration values.
pub mod defaults {
    use std::time::Duration;

    pub const CACHE_MAX_SIZE: usize = 100;
    pub const CACHE_DEFAULT_TTL_SECS: u64 = 300;
    pub const CACHE_CLEANUP_INTERVAL_SECS: u64 = 300;
    pub const IDLE_TIMEOUT_SECS: u64 = 30 * 60;
    pub const WARNING_LEAD_SECS: u64 = 5 * 60;
    pub const ACTIVITY_THROTTLE_SECS: u64 = 60;
    pub const CHECK_INTERVAL_SECS: u64 = 30;
    pub const STORAGE_KEY: &str = "lastActivity";
    pub const LOGIN_PATH: &str = "/login";

    pub fn cache_default_ttl() -> Duration {
        Duration::from_secs(CACHE_DEFAULT_TTL_SECS)
    }

    pub fn cache_cleanup_interval() -> Duration {
        Duration::from_secs(CACHE_CLEANUP_INTERVAL_SECS)
    }

    pub fn idle_timeout() -> Duration {
        Duration::from_secs(IDLE_TIMEOUT_SECS)
    }

    pub fn warning_lead() -> Duration {
        Duration::from_secs(WARNING_LEAD_SECS)
    }

    pub fn activity_throttle() -> Duration {
        Duration::from_secs(ACTIVITY_THROTTLE_SECS)
    }

    pub fn check_interval() -> Duration {
        Duration::from_secs(CHECK_INTERVAL_SECS)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Simple wrapper types for standalone config passing
// ─────────────────────────────────────────────────────────────────────────────

/// Standalone cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfigProvider {
    pub max_size: usize,
    pub default_ttl: Duration,
    pub cleanup_interval: Duration,
    pub cleanup_task_enabled: bool,
}

impl Default for CacheConfigProvider {
    fn default() -> Self {
        Self {
            max_size: defaults::CACHE_MAX_SIZE,
            default_ttl: defaults::cache_default_ttl(),
            cleanup_interval: defaults::cache_cleanup_interval(),
            cleanup_task_enabled: true,
        }
    }
}

impl ConfigProvider for CacheConfigProvider {}

impl HasCacheConfig for CacheConfigProvider {
    fn max_size(&self) -> usize {
        self.max_size
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn cleanup_interval(&self) -> Duration {
        self.cleanup_interval
    }

    fn cleanup_task_enabled(&self) -> bool {
        self.cleanup_task_enabled
    }
}

/// Standalone session monitor configuration.
#[derive(Debug, Clone)]
pub struct SessionConfigProvider {
    pub idle_timeout: Duration,
    pub warning_lead: Duration,
    pub activity_throttle: Duration,
    pub check_interval: Duration,
}

impl Default for SessionConfigProvider {
    fn default() -> Self {
        Self {
            idle_timeout: defaults::idle_timeout(),
            warning_lead: defaults::warning_lead(),
            activity_throttle: defaults::activity_throttle(),
            check_interval: defaults::check_interval(),
        }
    }
}

impl ConfigProvider for SessionConfigProvider {}

impl HasSessionConfig for SessionConfigProvider {
    fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    fn warning_lead(&self) -> Duration {
        self.warning_lead
    }

    fn activity_throttle(&self) -> Duration {
        self.activity_throttle
    }

    fn check_interval(&self) -> Duration {
        self.check_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_config_defaults() {
        let config = CacheConfigProvider::default();
        assert_eq!(config.max_size(), defaults::CACHE_MAX_SIZE);
        assert_eq!(config.default_ttl(), defaults::cache_default_ttl());
        assert!(config.cleanup_task_enabled());
    }

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfigProvider::default();
        assert_eq!(config.idle_timeout(), Duration::from_secs(1800));
        assert_eq!(config.warning_lead(), Duration::from_secs(300));
        assert_eq!(config.storage_key(), "lastActivity");
        assert_eq!(config.login_path(), "/login");
    }

    #[test]
    fn test_custom_session_config() {
        let config = SessionConfigProvider {
            idle_timeout: Duration::from_secs(600),
            warning_lead: Duration::from_secs(60),
            activity_throttle: Duration::from_secs(5),
            check_interval: Duration::from_secs(10),
        };
        assert_eq!(config.idle_timeout(), Duration::from_secs(600));
        assert_eq!(config.check_interval(), Duration::from_secs(10));
    }
}
