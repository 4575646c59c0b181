//! Configuration for the session activity monitor.

use std::time::Duration;

use curbside_types::{HasSessionConfig, config_defaults as defaults, duration_ms};

use crate::error::{Error, Result};

/// Configuration for the session activity monitor.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Idle horizon after which the user is signed out.
    pub timeout: Duration,

    /// How long before `timeout` the warning fires.
    pub warning_lead: Duration,

    /// Minimum interval between persisted updates from host activity events.
    pub activity_throttle: Duration,

    /// Interval of the periodic state check.
    pub check_interval: Duration,

    /// Key of the persisted last-activity timestamp.
    pub storage_key: String,

    /// Login entry point for the timeout redirect.
    pub login_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: defaults::idle_timeout(),
            warning_lead: defaults::warning_lead(),
            activity_throttle: defaults::activity_throttle(),
            check_interval: defaults::check_interval(),
            storage_key: defaults::STORAGE_KEY.to_string(),
            login_path: defaults::LOGIN_PATH.to_string(),
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from any type carrying session settings.
    pub fn from_provider<C: HasSessionConfig>(provider: &C) -> Self {
        Self {
            timeout: provider.idle_timeout(),
            warning_lead: provider.warning_lead(),
            activity_throttle: provider.activity_throttle(),
            check_interval: provider.check_interval(),
            storage_key: provider.storage_key(),
            login_path: provider.login_path(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_warning_lead(mut self, lead: Duration) -> Self {
        self.warning_lead = lead;
        self
    }

    pub fn with_activity_throttle(mut self, throttle: Duration) -> Self {
        self.activity_throttle = throttle;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    /// Elapsed idle time at which the warning state begins, in ms.
    pub fn warning_threshold_ms(&self) -> u64 {
        duration_ms(self.timeout).saturating_sub(duration_ms(self.warning_lead))
    }

    pub fn timeout_ms(&self) -> u64 {
        duration_ms(self.timeout)
    }

    /// Check that the durations describe a usable state machine.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be non-zero".to_string()));
        }
        if self.warning_lead >= self.timeout {
            return Err(Error::InvalidConfig(format!(
                "warning lead ({}s) must be shorter than the timeout ({}s)",
                self.warning_lead.as_secs(),
                self.timeout.as_secs()
            )));
        }
        if self.check_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "check interval must be non-zero".to_string(),
            ));
        }
        if self.storage_key.is_empty() {
            return Err(Error::InvalidConfig("storage key must not be empty".to_string()));
        }
        Ok(())
    }
}
