//! Derived session state and the timeout redirect target.

use std::fmt;

use crate::config::SessionConfig;

/// Reason flag carried by the timeout redirect.
pub const TIMEOUT_REASON: &str = "timeout";

/// Session state derived from idle time. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Idle time is below the warning threshold.
    Active,
    /// Within `warning_lead` of the timeout.
    Warning,
    /// Idle time reached the timeout.
    TimedOut,
}

impl SessionState {
    /// Classify an idle duration.
    pub fn evaluate(elapsed_ms: u64, config: &SessionConfig) -> Self {
        if elapsed_ms >= config.timeout_ms() {
            SessionState::TimedOut
        } else if elapsed_ms >= config.warning_threshold_ms() {
            SessionState::Warning
        } else {
            SessionState::Active
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Active => write!(f, "active"),
            SessionState::Warning => write!(f, "warning"),
            SessionState::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Where the host should send the user after a forced sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRedirect {
    pub path: String,
    pub reason: String,
}

impl LoginRedirect {
    /// Redirect to `path` flagged with the timeout reason.
    pub fn timeout(path: &str) -> Self {
        Self {
            path: path.to_string(),
            reason: TIMEOUT_REASON.to_string(),
        }
    }

    /// Render as `path?reason=...`, appending to an existing query string.
    pub fn to_url(&self) -> String {
        let sep = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{}reason={}", self.path, sep, self.reason)
    }
}

impl fmt::Display for LoginRedirect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_boundaries() {
        let config = SessionConfig::default();
        assert_eq!(SessionState::evaluate(0, &config), SessionState::Active);
        assert_eq!(SessionState::evaluate(1_499_999, &config), SessionState::Active);
        assert_eq!(SessionState::evaluate(1_500_000, &config), SessionState::Warning);
        assert_eq!(SessionState::evaluate(1_799_999, &config), SessionState::Warning);
        assert_eq!(SessionState::evaluate(1_800_000, &config), SessionState::TimedOut);
    }

    #[test]
    fn test_redirect_url() {
        assert_eq!(LoginRedirect::timeout("/login").to_url(), "/login?reason=timeout");
        assert_eq!(
            LoginRedirect::timeout("/auth?next=/requests").to_url(),
            "/auth?next=/requests&reason=timeout"
        );
    }
}
