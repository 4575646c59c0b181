//! Host callbacks for warning, timeout and redirect.

use std::time::Duration;

use crate::state::LoginRedirect;

/// Receives the monitor's state transitions.
///
/// All methods default to no-ops. Implementations should return quickly;
/// they run on the monitor's check task.
pub trait SessionListener: Send + Sync {
    /// The session entered the warning window.
    fn on_timeout_warning(&self, _remaining: Duration) {}

    /// The session timed out. Sign-out follows.
    fn on_timeout(&self) {}

    /// Navigate to the login entry point after sign-out.
    fn redirect(&self, _target: &LoginRedirect) {}
}

type WarningFn = Box<dyn Fn(Duration) + Send + Sync>;
type TimeoutFn = Box<dyn Fn() + Send + Sync>;
type RedirectFn = Box<dyn Fn(&LoginRedirect) + Send + Sync>;

/// Closure-based listener.
#[derive(Default)]
pub struct FnListener {
    on_warning: Option<WarningFn>,
    on_timeout: Option<TimeoutFn>,
    on_redirect: Option<RedirectFn>,
}

impl FnListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_warning(mut self, f: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_warning = Some(Box::new(f));
        self
    }

    pub fn on_timeout(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_timeout = Some(Box::new(f));
        self
    }

    pub fn on_redirect(mut self, f: impl Fn(&LoginRedirect) + Send + Sync + 'static) -> Self {
        self.on_redirect = Some(Box::new(f));
        self
    }
}

impl SessionListener for FnListener {
    fn on_timeout_warning(&self, remaining: Duration) {
        if let Some(f) = &self.on_warning {
            f(remaining);
        }
    }

    fn on_timeout(&self) {
        if let Some(f) = &self.on_timeout {
            f();
        }
    }

    fn redirect(&self, target: &LoginRedirect) {
        if let Some(f) = &self.on_redirect {
            f(target);
        }
    }
}

impl std::fmt::Debug for FnListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnListener")
            .field("on_warning", &self.on_warning.is_some())
            .field("on_timeout", &self.on_timeout.is_some())
            .field("on_redirect", &self.on_redirect.is_some())
            .finish()
    }
}
