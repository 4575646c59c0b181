//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [cache]                  # response cache
//! [session]                # idle-timeout monitor
//! [logging]                # CLI log output
//! ```

use std::path::PathBuf;
use std::time::Duration;

use curbside_types::config_defaults as defaults;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurbsideConfig {
    /// Response cache configuration.
    pub cache: Option<CacheSection>,

    /// Session activity monitor configuration.
    pub session: Option<SessionSection>,

    /// Log output configuration.
    pub logging: Option<LoggingConfig>,
}

impl CurbsideConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// A config with every section present at its default values.
    ///
    /// Used as the template written by `curbside config init`.
    pub fn with_defaults() -> Self {
        Self {
            cache: Some(CacheSection::default()),
            session: Some(SessionSection::default()),
            logging: Some(LoggingConfig::default()),
        }
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: CurbsideConfig) {
        if other.cache.is_some() {
            self.cache = other.cache;
        }

        if other.session.is_some() {
            self.session = other.session;
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }
    }

    /// Cache section, or defaults when absent.
    pub fn cache(&self) -> CacheSection {
        self.cache.clone().unwrap_or_default()
    }

    /// Session section, or defaults when absent.
    pub fn session(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// Logging section, or defaults when absent.
    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    /// Check value ranges across all present sections.
    pub fn validate(&self) -> Result<()> {
        if let Some(ref cache) = self.cache {
            cache.validate()?;
        }
        if let Some(ref session) = self.session {
            session.validate()?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cache Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Response cache configuration.
///
/// ```toml
/// [cache]
/// max_size = 100
/// cleanup_interval_secs = 300
/// enable_cleanup_task = true
/// default_ttl_secs = 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSection {
    /// Maximum number of entries before LRU eviction.
    pub max_size: usize,
    /// Interval in seconds between background sweeps.
    pub cleanup_interval_secs: u64,
    /// Whether the background sweep runs at all.
    pub enable_cleanup_task: bool,
    /// TTL in seconds for callers that do not pick one.
    pub default_ttl_secs: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_size: defaults::CACHE_MAX_SIZE,
            cleanup_interval_secs: defaults::CACHE_CLEANUP_INTERVAL_SECS,
            enable_cleanup_task: true,
            default_ttl_secs: defaults::CACHE_DEFAULT_TTL_SECS,
        }
    }
}

impl CacheSection {
    fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(ConfigError::invalid(
                "cache.max_size",
                "must be greater than zero",
            ));
        }
        if self.enable_cleanup_task && self.cleanup_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "cache.cleanup_interval_secs",
                "must be greater than zero when the cleanup task is enabled",
            ));
        }
        Ok(())
    }
}

impl curbside_types::ConfigProvider for CacheSection {}

impl curbside_types::HasCacheConfig for CacheSection {
    fn max_size(&self) -> usize {
        self.max_size
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }

    fn cleanup_task_enabled(&self) -> bool {
        self.enable_cleanup_task
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Session activity monitor configuration.
///
/// ```toml
/// [session]
/// timeout_secs = 1800
/// warning_lead_secs = 300
/// activity_throttle_secs = 60
/// check_interval_secs = 30
/// storage_key = "lastActivity"
/// login_path = "/login"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Idle seconds before the user is signed out.
    pub timeout_secs: u64,
    /// Seconds before the timeout at which the warning fires.
    pub warning_lead_secs: u64,
    /// Minimum seconds between persisted activity updates.
    pub activity_throttle_secs: u64,
    /// Seconds between periodic state checks.
    pub check_interval_secs: u64,
    /// Key of the persisted last-activity timestamp.
    pub storage_key: String,
    /// Login entry point for the timeout redirect.
    pub login_path: String,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            timeout_secs: defaults::IDLE_TIMEOUT_SECS,
            warning_lead_secs: defaults::WARNING_LEAD_SECS,
            activity_throttle_secs: defaults::ACTIVITY_THROTTLE_SECS,
            check_interval_secs: defaults::CHECK_INTERVAL_SECS,
            storage_key: defaults::STORAGE_KEY.to_string(),
            login_path: defaults::LOGIN_PATH.to_string(),
        }
    }
}

impl SessionSection {
    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "session.timeout_secs",
                "must be greater than zero",
            ));
        }
        if self.warning_lead_secs >= self.timeout_secs {
            return Err(ConfigError::invalid(
                "session.warning_lead_secs",
                format!(
                    "must be less than session.timeout_secs ({})",
                    self.timeout_secs
                ),
            ));
        }
        if self.check_interval_secs == 0 {
            return Err(ConfigError::invalid(
                "session.check_interval_secs",
                "must be greater than zero",
            ));
        }
        if self.storage_key.is_empty() {
            return Err(ConfigError::invalid(
                "session.storage_key",
                "must not be empty",
            ));
        }
        Ok(())
    }
}

impl curbside_types::ConfigProvider for SessionSection {}

impl curbside_types::HasSessionConfig for SessionSection {
    fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn warning_lead(&self) -> Duration {
        Duration::from_secs(self.warning_lead_secs)
    }

    fn activity_throttle(&self) -> Duration {
        Duration::from_secs(self.activity_throttle_secs)
    }

    fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    fn storage_key(&self) -> String {
        self.storage_key.clone()
    }

    fn login_path(&self) -> String {
        self.login_path.clone()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Logging Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// Logging configuration section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Whether to write a daily-rolling JSON log file.
    pub file: bool,
    /// Directory for log files. Defaults to `logs/` under the config dir.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: true,
            directory: None,
        }
    }
}
