//! Host activity events and the throttled handle that records them.

use std::fmt;
use std::sync::Weak;

use tracing::trace;

use crate::monitor::MonitorInner;

/// A discrete user-activity event reported by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityEvent {
    PointerDown,
    KeyDown,
    Scroll,
    TouchStart,
    /// Any other host-defined signal.
    Custom(String),
}

impl fmt::Display for ActivityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityEvent::PointerDown => write!(f, "pointerdown"),
            ActivityEvent::KeyDown => write!(f, "keydown"),
            ActivityEvent::Scroll => write!(f, "scroll"),
            ActivityEvent::TouchStart => write!(f, "touchstart"),
            ActivityEvent::Custom(name) => write!(f, "{}", name),
        }
    }
}

/// Handle through which a host reports activity.
///
/// Returned by [`crate::SessionMonitor::init`]. Notifications are throttled:
/// the first event after the throttle window is recorded and events inside
/// the window are dropped. After `cleanup()` the handle is inert.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    pub(crate) inner: Weak<MonitorInner>,
    pub(crate) epoch: u64,
}

impl ActivityHandle {
    /// Report an activity event. Returns whether it was recorded.
    pub fn notify(&self, event: ActivityEvent) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let recorded = inner.record_throttled(self.epoch);
        trace!(event = %event, recorded, "Activity event");
        recorded
    }

    /// Whether the monitor this handle belongs to is still initialized.
    pub fn is_live(&self) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.is_live_epoch(self.epoch))
    }
}
