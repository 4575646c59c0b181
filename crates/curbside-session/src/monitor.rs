//! Idle-timeout monitor.
//!
//! The monitor derives its state from a single persisted timestamp, the
//! last recorded activity. A periodic check compares idle time against the
//! configured thresholds and drives the warning → sign-out sequence:
//!
//! ```text
//!   Active ──(timeout - warning_lead)──▶ Warning ──(timeout)──▶ TimedOut
//!      ▲                                    │                      │
//!      └──── record_activity / extend ──────┴──── record_activity ─┘
//! ```
//!
//! Construct one monitor at bootstrap and pass it by reference; `init`
//! and `cleanup` bracket its active lifetime.

use std::sync::Arc;
use std::sync::Weak;
use std::time::Duration;

use futures::{Stream, StreamExt};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use curbside_types::{SharedClock, SystemClock, duration_ms};

use crate::activity::{ActivityEvent, ActivityHandle};
use crate::auth::SharedAuthProvider;
use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::listener::SessionListener;
use crate::state::{LoginRedirect, SessionState};
use crate::storage::SharedActivityStore;

/// Mutable registration state, guarded by one lock.
#[derive(Default)]
struct Registration {
    listener: Option<Arc<dyn SessionListener>>,
    check_task: Option<JoinHandle<()>>,
    sources: Vec<JoinHandle<()>>,

    /// Incremented by `cleanup()`; handles and dispatches from an older
    /// epoch are ignored.
    epoch: u64,

    /// Warning already delivered for the current idle stretch.
    warned: bool,

    /// Timeout already handled; holds until the persisted activity moves
    /// back out of the timeout window.
    timed_out: bool,

    /// Last activity recorded through a throttled handle (epoch ms).
    last_throttled_at: Option<u64>,
}

impl Registration {
    fn is_live(&self) -> bool {
        self.listener.is_some()
    }

    fn reset_idle(&mut self, now: u64) {
        self.warned = false;
        self.timed_out = false;
        self.last_throttled_at = Some(now);
    }

    fn stop_tasks(&mut self) {
        if let Some(task) = self.check_task.take() {
            task.abort();
        }
        for task in self.sources.drain(..) {
            task.abort();
        }
    }
}

pub(crate) struct MonitorInner {
    config: SessionConfig,
    clock: SharedClock,
    store: SharedActivityStore,
    auth: SharedAuthProvider,
    registration: Mutex<Registration>,
}

impl MonitorInner {
    fn last_activity(&self) -> Option<u64> {
        let raw = self.store.get_item(&self.config.storage_key)?;
        match raw.trim().parse::<u64>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                warn!(value = %raw, "Ignoring unparseable activity timestamp");
                None
            }
        }
    }

    fn persist_activity(&self, now: u64) {
        if let Err(e) = self
            .store
            .set_item(&self.config.storage_key, &now.to_string())
        {
            warn!(error = %e, "Failed to persist activity timestamp");
        }
    }

    /// Idle time in ms. With nothing persisted the session counts as fresh.
    fn elapsed_ms(&self, now: u64) -> u64 {
        self.last_activity()
            .map(|last| now.saturating_sub(last))
            .unwrap_or(0)
    }

    pub(crate) fn is_live_epoch(&self, epoch: u64) -> bool {
        let reg = self.registration.lock();
        reg.is_live() && reg.epoch == epoch
    }

    /// Record activity from a host event, honouring the throttle window.
    pub(crate) fn record_throttled(&self, epoch: u64) -> bool {
        let now = self.clock.now_ms();
        {
            let mut reg = self.registration.lock();
            if !reg.is_live() || reg.epoch != epoch || reg.timed_out {
                return false;
            }
            if let Some(last) = reg.last_throttled_at {
                if now.saturating_sub(last) < duration_ms(self.config.activity_throttle) {
                    return false;
                }
            }
            reg.reset_idle(now);
        }
        self.persist_activity(now);
        true
    }

    /// Sign out after a timeout, then redirect unless the monitor was
    /// cleaned up meanwhile.
    async fn finish_timeout(self: Arc<Self>, listener: Arc<dyn SessionListener>, epoch: u64) {
        if let Err(e) = self.auth.sign_out().await {
            warn!(error = %e, "Sign-out failed during session timeout");
        }

        if self.is_live_epoch(epoch) {
            let target = LoginRedirect::timeout(&self.config.login_path);
            debug!(target = %target, "Redirecting after timeout");
            listener.redirect(&target);
        } else {
            debug!("Monitor cleaned up during sign-out, skipping redirect");
        }
    }
}

impl Drop for MonitorInner {
    fn drop(&mut self) {
        self.registration.get_mut().stop_tasks();
    }
}

/// What a check decided to deliver once the lock is released.
enum Dispatch {
    None,
    Warning(Arc<dyn SessionListener>, Duration),
    Timeout(Arc<dyn SessionListener>, u64),
}

/// Session activity monitor.
///
/// Cloning yields another handle to the same monitor.
#[derive(Clone)]
pub struct SessionMonitor {
    inner: Arc<MonitorInner>,
}

impl SessionMonitor {
    /// Create a monitor driven by the system clock.
    pub fn new(
        config: SessionConfig,
        store: SharedActivityStore,
        auth: SharedAuthProvider,
    ) -> Result<Self> {
        Self::with_clock(config, store, auth, SystemClock::shared())
    }

    /// Create a monitor driven by the given clock.
    pub fn with_clock(
        config: SessionConfig,
        store: SharedActivityStore,
        auth: SharedAuthProvider,
        clock: SharedClock,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(MonitorInner {
                config,
                clock,
                store,
                auth,
                registration: Mutex::new(Registration::default()),
            }),
        })
    }

    /// Get the monitor configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Start monitoring.
    ///
    /// Registers `listener`, starts the periodic check and returns the
    /// handle through which the host reports activity. Calling `init` on an
    /// initialized monitor returns the existing handle and keeps the
    /// original listener. A timestamp is seeded only if none is persisted,
    /// so idle time carries over across restarts.
    pub fn init(&self, listener: Arc<dyn SessionListener>) -> Result<ActivityHandle> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;

        let mut reg = self.inner.registration.lock();
        if reg.is_live() {
            debug!("Session monitor already initialized");
            return Ok(self.handle_for(reg.epoch));
        }

        let now = self.inner.clock.now_ms();
        if self.inner.last_activity().is_none() {
            self.inner.persist_activity(now);
        }
        reg.warned = false;
        reg.timed_out = false;
        reg.last_throttled_at = None;
        reg.listener = Some(listener);

        let period = self.inner.config.check_interval;
        let weak = Arc::downgrade(&self.inner);
        reg.check_task = Some(runtime.spawn(run_checks(weak, period)));

        info!(
            timeout_secs = self.inner.config.timeout.as_secs(),
            warning_lead_secs = self.inner.config.warning_lead.as_secs(),
            "Session monitor started"
        );

        Ok(self.handle_for(reg.epoch))
    }

    fn handle_for(&self, epoch: u64) -> ActivityHandle {
        ActivityHandle {
            inner: Arc::downgrade(&self.inner),
            epoch,
        }
    }

    /// Forward a stream of host activity events through a throttled handle.
    ///
    /// The forwarding task stops on `cleanup()`.
    pub fn attach_source<S>(&self, source: S) -> Result<()>
    where
        S: Stream<Item = ActivityEvent> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let mut reg = self.inner.registration.lock();
        if !reg.is_live() {
            return Err(Error::NotInitialized);
        }

        let handle = self.handle_for(reg.epoch);
        let task = runtime.spawn(async move {
            let mut source = Box::pin(source);
            while let Some(event) = source.next().await {
                handle.notify(event);
            }
            trace!("Activity source ended");
        });
        reg.sources.push(task);
        Ok(())
    }

    /// Record activity now, ignoring the throttle.
    ///
    /// Used to seed state on login. Also lifts a timed-out session back to
    /// active.
    pub fn record_activity(&self) {
        let now = self.inner.clock.now_ms();
        self.inner.persist_activity(now);
        self.inner.registration.lock().reset_idle(now);
        trace!(at = now, "Activity recorded");
    }

    /// Persisted timestamp of the last recorded activity (epoch ms).
    pub fn last_activity(&self) -> Option<u64> {
        self.inner.last_activity()
    }

    /// Idle time since the last recorded activity.
    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.inner.elapsed_ms(self.inner.clock.now_ms()))
    }

    /// Time left before the timeout, zero once reached.
    pub fn remaining_time(&self) -> Duration {
        self.inner.config.timeout.saturating_sub(self.elapsed())
    }

    /// Current state, without side effects.
    pub fn state(&self) -> SessionState {
        let elapsed = self.inner.elapsed_ms(self.inner.clock.now_ms());
        SessionState::evaluate(elapsed, &self.inner.config)
    }

    /// Whether `init` has been called and `cleanup` has not.
    pub fn is_initialized(&self) -> bool {
        self.inner.registration.lock().is_live()
    }

    /// Run one check: evaluate the state and notify the listener.
    ///
    /// The warning is delivered once per idle stretch. On timeout the
    /// listener is told, the auth collaborator signs the user out exactly
    /// once, and the listener receives the login redirect. Nothing is
    /// dispatched while the monitor is not initialized.
    ///
    /// Sign-out runs on its own task: `cleanup()` or dropping this future
    /// does not cancel it, only the redirect is skipped after cleanup.
    pub async fn check(&self) -> SessionState {
        let elapsed = self.inner.elapsed_ms(self.inner.clock.now_ms());
        let state = SessionState::evaluate(elapsed, &self.inner.config);
        let remaining = self
            .inner
            .config
            .timeout
            .saturating_sub(Duration::from_millis(elapsed));

        let dispatch = {
            let mut reg = self.inner.registration.lock();
            match (reg.listener.clone(), state) {
                (None, _) => Dispatch::None,
                (Some(_), SessionState::Active) => {
                    reg.warned = false;
                    reg.timed_out = false;
                    Dispatch::None
                }
                (Some(listener), SessionState::Warning) => {
                    if reg.warned || reg.timed_out {
                        Dispatch::None
                    } else {
                        reg.warned = true;
                        Dispatch::Warning(listener, remaining)
                    }
                }
                (Some(listener), SessionState::TimedOut) => {
                    if reg.timed_out {
                        Dispatch::None
                    } else {
                        reg.timed_out = true;
                        Dispatch::Timeout(listener, reg.epoch)
                    }
                }
            }
        };

        match dispatch {
            Dispatch::None => {}
            Dispatch::Warning(listener, remaining) => {
                info!(remaining_secs = remaining.as_secs(), "Session idle, warning user");
                listener.on_timeout_warning(remaining);
            }
            Dispatch::Timeout(listener, epoch) => {
                info!("Session timed out, signing out");
                listener.on_timeout();

                let finish = Arc::clone(&self.inner).finish_timeout(listener, epoch);
                match tokio::runtime::Handle::try_current() {
                    Ok(runtime) => {
                        if let Err(e) = runtime.spawn(finish).await {
                            warn!(error = %e, "Sign-out task failed");
                        }
                    }
                    Err(_) => finish.await,
                }
            }
        }

        state
    }

    /// Ask the auth collaborator to extend the session.
    ///
    /// On success activity is reset and `true` is returned. On failure the
    /// state is left untouched and `false` is returned.
    pub async fn extend_session(&self) -> bool {
        match self.inner.auth.refresh_credential().await {
            Ok(()) => {
                self.record_activity();
                info!("Session extended");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to extend session");
                false
            }
        }
    }

    /// Stop monitoring: drop the listener, invalidate activity handles and
    /// stop the periodic check and attached sources.
    ///
    /// Safe to call repeatedly. In-flight `extend_session` calls and a
    /// timeout sign-out already started are not cancelled.
    pub fn cleanup(&self) {
        let mut reg = self.inner.registration.lock();
        if !reg.is_live() && reg.check_task.is_none() && reg.sources.is_empty() {
            return;
        }

        reg.listener = None;
        reg.epoch += 1;
        reg.warned = false;
        reg.stop_tasks();
        debug!("Session monitor cleaned up");
    }
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("config", &self.inner.config)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

/// Periodic check loop. Holds only a weak reference so dropping the last
/// monitor handle ends it.
async fn run_checks(inner: Weak<MonitorInner>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(inner) = inner.upgrade() else {
            break;
        };
        let state = SessionMonitor { inner }.check().await;
        trace!(state = %state, "Session check");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::InMemoryAuth;
    use crate::listener::FnListener;
    use crate::storage::{ActivityStore, MemoryStore};
    use curbside_types::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};

    const START: u64 = 1_700_000_000_000;

    struct Fixture {
        monitor: SessionMonitor,
        clock: ManualClock,
        store: MemoryStore,
        auth: Arc<InMemoryAuth>,
    }

    fn fixture() -> Fixture {
        let clock = ManualClock::new(START);
        let store = MemoryStore::new();
        let auth = Arc::new(InMemoryAuth::new());
        let config = SessionConfig::new()
            .with_check_interval(Duration::from_secs(3600))
            .with_activity_throttle(Duration::from_secs(60));
        let monitor = SessionMonitor::with_clock(
            config,
            Arc::new(store.clone()),
            auth.clone(),
            clock.shared(),
        )
        .unwrap();
        Fixture {
            monitor,
            clock,
            store,
            auth,
        }
    }

    fn counting_listener() -> (Arc<FnListener>, Arc<AtomicU32>, Arc<AtomicU32>) {
        let warnings = Arc::new(AtomicU32::new(0));
        let timeouts = Arc::new(AtomicU32::new(0));
        let (w, t) = (warnings.clone(), timeouts.clone());
        let listener = FnListener::new()
            .on_warning(move |_| {
                w.fetch_add(1, Ordering::SeqCst);
            })
            .on_timeout(move || {
                t.fetch_add(1, Ordering::SeqCst);
            });
        (Arc::new(listener), warnings, timeouts)
    }

    #[test]
    fn test_init_requires_runtime() {
        let f = fixture();
        let (listener, _, _) = counting_listener();
        assert!(matches!(f.monitor.init(listener), Err(Error::NoRuntime)));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = SessionConfig::new().with_warning_lead(Duration::from_secs(3600));
        let result = SessionMonitor::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(InMemoryAuth::new()),
        );
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test]
    async fn test_init_seeds_only_when_absent() {
        let f = fixture();
        f.store.set_item("lastActivity", &(START - 60_000).to_string()).unwrap();

        let (listener, _, _) = counting_listener();
        f.monitor.init(listener).unwrap();

        assert_eq!(f.monitor.last_activity(), Some(START - 60_000));
        assert_eq!(f.monitor.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let f = fixture();
        let (first, _, _) = counting_listener();
        let (second, _, _) = counting_listener();

        let a = f.monitor.init(first).unwrap();
        let b = f.monitor.init(second).unwrap();
        assert_eq!(a.epoch, b.epoch);
        assert!(f.monitor.is_initialized());
    }

    #[tokio::test]
    async fn test_warning_fires_once_per_idle_stretch() {
        let f = fixture();
        let (listener, warnings, _) = counting_listener();
        f.monitor.init(listener).unwrap();

        f.clock.advance(Duration::from_millis(1_500_001));
        assert_eq!(f.monitor.check().await, SessionState::Warning);
        assert_eq!(f.monitor.check().await, SessionState::Warning);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);

        f.monitor.record_activity();
        assert_eq!(f.monitor.check().await, SessionState::Active);

        f.clock.advance(Duration::from_millis(1_500_001));
        f.monitor.check().await;
        assert_eq!(warnings.load(Ordering::SeqCst), 2);
    }

    /// Store that counts reads.
    #[derive(Debug, Default)]
    struct CountingStore {
        inner: MemoryStore,
        reads: AtomicU32,
    }

    impl ActivityStore for CountingStore {
        fn get_item(&self, key: &str) -> Option<String> {
            self.reads.fetch_add(1, Ordering::SeqCst);
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> crate::error::Result<()> {
            self.inner.set_item(key, value)
        }
    }

    #[tokio::test]
    async fn test_warning_remaining_matches_evaluated_state() {
        let clock = ManualClock::new(START);
        let store = Arc::new(CountingStore::default());
        let monitor = SessionMonitor::with_clock(
            SessionConfig::new().with_check_interval(Duration::from_secs(3600)),
            store.clone(),
            Arc::new(InMemoryAuth::new()),
            clock.shared(),
        )
        .unwrap();

        let remaining = Arc::new(parking_lot::Mutex::new(None));
        let seen = remaining.clone();
        monitor
            .init(Arc::new(FnListener::new().on_warning(move |left| {
                *seen.lock() = Some(left);
            })))
            .unwrap();

        clock.advance(Duration::from_millis(1_500_001));
        let reads_before = store.reads.load(Ordering::SeqCst);
        assert_eq!(monitor.check().await, SessionState::Warning);

        assert_eq!(*remaining.lock(), Some(Duration::from_millis(299_999)));
        assert_eq!(store.reads.load(Ordering::SeqCst) - reads_before, 1);
    }

    #[tokio::test]
    async fn test_times_out_again_after_activity_elsewhere() {
        let f = fixture();
        let (listener, warnings, timeouts) = counting_listener();
        f.monitor.init(listener).unwrap();

        f.clock.advance(Duration::from_millis(1_800_001));
        assert_eq!(f.monitor.check().await, SessionState::TimedOut);
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);

        // Another monitor on the same store records activity.
        f.store.set_item("lastActivity", &(START + 1_800_001).to_string()).unwrap();
        assert_eq!(f.monitor.check().await, SessionState::Active);

        f.clock.advance(Duration::from_millis(1_500_001));
        assert_eq!(f.monitor.check().await, SessionState::Warning);
        assert_eq!(warnings.load(Ordering::SeqCst), 1);

        f.clock.advance(Duration::from_millis(300_000));
        assert_eq!(f.monitor.check().await, SessionState::TimedOut);
        assert_eq!(timeouts.load(Ordering::SeqCst), 2);
        assert_eq!(f.auth.sign_out_count(), 2);
    }

    #[tokio::test]
    async fn test_throttled_activity() {
        let f = fixture();
        let (listener, _, _) = counting_listener();
        let handle = f.monitor.init(listener).unwrap();

        assert!(handle.notify(ActivityEvent::PointerDown));
        f.clock.advance(Duration::from_secs(30));
        assert!(!handle.notify(ActivityEvent::KeyDown));
        assert_eq!(f.monitor.elapsed(), Duration::from_secs(30));

        f.clock.advance(Duration::from_secs(30));
        assert!(handle.notify(ActivityEvent::Scroll));
        assert_eq!(f.monitor.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_activity_ignored_after_timeout() {
        let f = fixture();
        let (listener, _, timeouts) = counting_listener();
        let handle = f.monitor.init(listener).unwrap();

        f.clock.advance(Duration::from_millis(1_800_001));
        assert_eq!(f.monitor.check().await, SessionState::TimedOut);
        assert_eq!(timeouts.load(Ordering::SeqCst), 1);

        assert!(!handle.notify(ActivityEvent::TouchStart));
        assert_eq!(f.monitor.state(), SessionState::TimedOut);

        f.monitor.record_activity();
        assert_eq!(f.monitor.state(), SessionState::Active);
        assert!(f.auth.sign_out_count() == 1);
    }

    #[tokio::test]
    async fn test_cleanup_makes_handles_inert() {
        let f = fixture();
        let (listener, _, _) = counting_listener();
        let handle = f.monitor.init(listener).unwrap();
        assert!(handle.is_live());

        f.monitor.cleanup();
        f.monitor.cleanup();
        assert!(!handle.is_live());
        assert!(!f.monitor.is_initialized());

        f.clock.advance(Duration::from_secs(120));
        assert!(!handle.notify(ActivityEvent::KeyDown));
    }

    #[tokio::test]
    async fn test_check_without_init_dispatches_nothing() {
        let f = fixture();
        f.monitor.record_activity();
        f.clock.advance(Duration::from_secs(3600));

        assert_eq!(f.monitor.check().await, SessionState::TimedOut);
        assert_eq!(f.auth.sign_out_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_timestamp_reads_as_fresh() {
        let f = fixture();
        f.store.set_item("lastActivity", "yesterday").unwrap();
        assert_eq!(f.monitor.last_activity(), None);
        assert_eq!(f.monitor.remaining_time(), Duration::from_secs(1800));
    }
}
