//! Idle-timeout session activity monitor.
//!
//! Tracks user idle time against a configurable timeout, warns before
//! expiry and forces sign-out at expiry:
//! - State derived from one persisted last-activity timestamp, so idle
//!   time survives restarts and is shared by every monitor on the store
//! - Host-agnostic activity reporting through a throttled handle
//! - Auth, storage and UI collaborators behind traits
//!
//! # Example
//!
//! ```rust,ignore
//! use curbside_session::{FnListener, MemoryStore, SessionConfig, SessionMonitor};
//!
//! let monitor = SessionMonitor::new(SessionConfig::default(), Arc::new(MemoryStore::new()), auth)?;
//! let activity = monitor.init(Arc::new(
//!     FnListener::new().on_warning(|left| show_banner(left)).on_redirect(|to| navigate(to)),
//! ))?;
//! activity.notify(ActivityEvent::KeyDown);
//! ```

mod activity;
mod auth;
mod config;
mod error;
mod listener;
mod monitor;
mod state;
mod storage;

pub use activity::{ActivityEvent, ActivityHandle};
pub use auth::{AuthProvider, InMemoryAuth, SharedAuthProvider};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use listener::{FnListener, SessionListener};
pub use monitor::SessionMonitor;
pub use state::{LoginRedirect, SessionState, TIMEOUT_REASON};
pub use storage::{ActivityStore, FileStore, MemoryStore, STATE_FILE, SharedActivityStore};
