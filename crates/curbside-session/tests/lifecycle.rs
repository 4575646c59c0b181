//! Session monitor lifecycle tests.
//!
//! Time is driven by a `ManualClock`; the periodic check task is driven by
//! tokio's paused clock where it matters.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use curbside_session::{
    ActivityEvent, AuthProvider, FileStore, FnListener, InMemoryAuth, LoginRedirect, MemoryStore,
    SessionConfig, SessionListener, SessionMonitor, SessionState,
};
use curbside_types::ManualClock;
use parking_lot::Mutex;
use tokio::sync::Notify;

const START: u64 = 1_700_000_000_000;

/// Listener that records everything it receives.
#[derive(Default)]
struct Recorder {
    warnings: AtomicU32,
    timeouts: AtomicU32,
    redirects: Mutex<Vec<LoginRedirect>>,
}

impl SessionListener for Recorder {
    fn on_timeout_warning(&self, _remaining: Duration) {
        self.warnings.fetch_add(1, Ordering::SeqCst);
    }

    fn on_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::SeqCst);
    }

    fn redirect(&self, target: &LoginRedirect) {
        self.redirects.lock().push(target.clone());
    }
}

fn config() -> SessionConfig {
    SessionConfig::new()
        .with_timeout(Duration::from_millis(1_800_000))
        .with_warning_lead(Duration::from_millis(300_000))
        .with_check_interval(Duration::from_secs(30))
}

fn monitor_with(
    clock: &ManualClock,
    store: MemoryStore,
    auth: Arc<dyn AuthProvider>,
) -> SessionMonitor {
    SessionMonitor::with_clock(config(), Arc::new(store), auth, clock.shared()).unwrap()
}

#[tokio::test]
async fn test_warning_then_timeout_thresholds() -> Result<()> {
    let clock = ManualClock::new(START);
    let auth = Arc::new(InMemoryAuth::new());
    let monitor = monitor_with(&clock, MemoryStore::new(), auth.clone());
    let recorder = Arc::new(Recorder::default());
    monitor.init(recorder.clone())?;

    clock.set(START + 1_499_999);
    assert_eq!(monitor.check().await, SessionState::Active);
    assert_eq!(recorder.warnings.load(Ordering::SeqCst), 0);

    clock.set(START + 1_500_001);
    assert_eq!(monitor.check().await, SessionState::Warning);
    assert_eq!(recorder.warnings.load(Ordering::SeqCst), 1);
    assert_eq!(auth.sign_out_count(), 0);

    clock.set(START + 1_800_001);
    assert_eq!(monitor.check().await, SessionState::TimedOut);
    assert_eq!(monitor.check().await, SessionState::TimedOut);

    assert_eq!(recorder.timeouts.load(Ordering::SeqCst), 1);
    assert_eq!(auth.sign_out_count(), 1);
    assert!(!auth.is_signed_in());
    assert_eq!(
        recorder.redirects.lock().as_slice(),
        &[LoginRedirect::timeout("/login")]
    );
    assert_eq!(recorder.redirects.lock()[0].to_url(), "/login?reason=timeout");
    assert_eq!(monitor.remaining_time(), Duration::ZERO);
    Ok(())
}

#[tokio::test]
async fn test_extend_session_success_resets_idle_time() -> Result<()> {
    let clock = ManualClock::new(START);
    let auth = Arc::new(InMemoryAuth::new());
    let monitor = monitor_with(&clock, MemoryStore::new(), auth.clone());
    monitor.init(Arc::new(FnListener::new()))?;

    clock.advance(Duration::from_secs(1_600));
    assert_eq!(monitor.state(), SessionState::Warning);

    assert!(monitor.extend_session().await);
    assert_eq!(monitor.remaining_time(), Duration::from_millis(1_800_000));
    assert_eq!(monitor.state(), SessionState::Active);
    assert_eq!(auth.refresh_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_extend_session_failure_leaves_state() -> Result<()> {
    let clock = ManualClock::new(START);
    let auth = Arc::new(InMemoryAuth::new());
    auth.set_refresh_succeeds(false);
    let monitor = monitor_with(&clock, MemoryStore::new(), auth.clone());
    monitor.init(Arc::new(FnListener::new()))?;

    let before = monitor.last_activity();
    clock.advance(Duration::from_secs(1_600));

    assert!(!monitor.extend_session().await);
    assert_eq!(monitor.last_activity(), before);
    assert_eq!(monitor.state(), SessionState::Warning);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_periodic_check_drives_timeout() -> Result<()> {
    let clock = ManualClock::new(START);
    let auth = Arc::new(InMemoryAuth::new());
    let monitor = monitor_with(&clock, MemoryStore::new(), auth.clone());

    let timed_out = Arc::new(Notify::new());
    let signal = timed_out.clone();
    let redirected = Arc::new(Mutex::new(None));
    let target = redirected.clone();
    monitor.init(Arc::new(
        FnListener::new()
            .on_timeout(move || signal.notify_one())
            .on_redirect(move |to| *target.lock() = Some(to.to_url())),
    ))?;

    clock.advance(Duration::from_secs(1_801));
    tokio::time::timeout(Duration::from_secs(60), timed_out.notified()).await?;
    tokio::time::sleep(Duration::from_millis(1)).await;

    assert_eq!(auth.sign_out_count(), 1);
    assert_eq!(redirected.lock().as_deref(), Some("/login?reason=timeout"));

    monitor.cleanup();
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_stops_periodic_check() -> Result<()> {
    let clock = ManualClock::new(START);
    let auth = Arc::new(InMemoryAuth::new());
    let monitor = monitor_with(&clock, MemoryStore::new(), auth.clone());
    let recorder = Arc::new(Recorder::default());
    monitor.init(recorder.clone())?;

    monitor.cleanup();
    clock.advance(Duration::from_secs(7_200));
    tokio::time::sleep(Duration::from_secs(120)).await;

    assert_eq!(recorder.timeouts.load(Ordering::SeqCst), 0);
    assert_eq!(auth.sign_out_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_attached_source_records_activity() -> Result<()> {
    let clock = ManualClock::new(START);
    let monitor = monitor_with(&clock, MemoryStore::new(), Arc::new(InMemoryAuth::new()));
    monitor.init(Arc::new(FnListener::new()))?;

    let (tx, rx) = futures::channel::mpsc::unbounded();
    monitor.attach_source(rx)?;

    clock.advance(Duration::from_secs(600));
    tx.unbounded_send(ActivityEvent::KeyDown)?;
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    assert_eq!(monitor.last_activity(), Some(START + 600_000));
    Ok(())
}

#[tokio::test]
async fn test_attach_source_requires_init() {
    let clock = ManualClock::new(START);
    let monitor = monitor_with(&clock, MemoryStore::new(), Arc::new(InMemoryAuth::new()));
    let (_tx, rx) = futures::channel::mpsc::unbounded::<ActivityEvent>();
    assert!(monitor.attach_source(rx).is_err());
}

#[tokio::test]
async fn test_activity_is_shared_through_store() -> Result<()> {
    let clock = ManualClock::new(START);
    let store = MemoryStore::new();
    let first = monitor_with(&clock, store.clone(), Arc::new(InMemoryAuth::new()));
    let second = monitor_with(&clock, store, Arc::new(InMemoryAuth::new()));
    first.init(Arc::new(FnListener::new()))?;
    let other_tab = second.init(Arc::new(FnListener::new()))?;

    clock.advance(Duration::from_secs(1_700));
    assert_eq!(first.state(), SessionState::Warning);

    assert!(other_tab.notify(ActivityEvent::PointerDown));
    assert_eq!(first.state(), SessionState::Active);
    Ok(())
}

#[tokio::test]
async fn test_idle_time_survives_restart() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let clock = ManualClock::new(START);

    {
        let monitor = SessionMonitor::with_clock(
            config(),
            Arc::new(FileStore::new(dir.path())),
            Arc::new(InMemoryAuth::new()),
            clock.shared(),
        )?;
        monitor.init(Arc::new(FnListener::new()))?;
        monitor.cleanup();
    }

    clock.advance(Duration::from_secs(900));

    let restarted = SessionMonitor::with_clock(
        config(),
        Arc::new(FileStore::new(dir.path())),
        Arc::new(InMemoryAuth::new()),
        clock.shared(),
    )?;
    restarted.init(Arc::new(FnListener::new()))?;
    assert_eq!(restarted.elapsed(), Duration::from_secs(900));
    assert_eq!(restarted.remaining_time(), Duration::from_secs(900));
    Ok(())
}

/// Auth provider whose sign-out waits until released.
#[derive(Debug, Default)]
struct SlowSignOut {
    release: Notify,
    calls: AtomicU32,
    finished: AtomicU32,
}

#[async_trait]
impl AuthProvider for SlowSignOut {
    async fn sign_out(&self) -> curbside_session::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.release.notified().await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn refresh_credential(&self) -> curbside_session::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_cleanup_during_sign_out_suppresses_redirect() -> Result<()> {
    let clock = ManualClock::new(START);
    let auth = Arc::new(SlowSignOut::default());
    let monitor = monitor_with(&clock, MemoryStore::new(), auth.clone());
    let recorder = Arc::new(Recorder::default());
    monitor.init(recorder.clone())?;

    clock.advance(Duration::from_secs(1_801));
    let checking = tokio::spawn({
        let monitor = monitor.clone();
        async move { monitor.check().await }
    });
    while auth.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    monitor.cleanup();
    auth.release.notify_one();
    assert_eq!(checking.await?, SessionState::TimedOut);

    assert_eq!(recorder.timeouts.load(Ordering::SeqCst), 1);
    assert!(recorder.redirects.lock().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cleanup_does_not_cancel_periodic_sign_out() -> Result<()> {
    let clock = ManualClock::new(START);
    let auth = Arc::new(SlowSignOut::default());
    let monitor = monitor_with(&clock, MemoryStore::new(), auth.clone());
    let recorder = Arc::new(Recorder::default());
    monitor.init(recorder.clone())?;

    clock.advance(Duration::from_secs(1_801));
    tokio::time::sleep(Duration::from_secs(31)).await;
    while auth.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(recorder.timeouts.load(Ordering::SeqCst), 1);

    monitor.cleanup();
    auth.release.notify_one();
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    assert_eq!(auth.finished.load(Ordering::SeqCst), 1);
    assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    assert!(recorder.redirects.lock().is_empty());
    Ok(())
}
