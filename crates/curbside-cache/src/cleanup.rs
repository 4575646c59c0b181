//! Background sweep of expired entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::cache::MemoryCache;

/// Handle to a running cleanup task. The task stops when the handle is
/// stopped or dropped.
#[derive(Debug)]
pub struct CleanupTask {
    handle: JoinHandle<()>,
}

impl CleanupTask {
    /// Stop the task.
    pub fn stop(self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a task that calls [`MemoryCache::cleanup`] every `interval`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_cleanup_task<V>(cache: MemoryCache<V>, interval: Duration) -> CleanupTask
where
    V: Clone + Send + Sync + 'static,
{
    let period = interval.max(Duration::from_millis(1));
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        debug!(interval_ms = period.as_millis() as u64, "Cache cleanup task started");

        loop {
            ticker.tick().await;
            let removed = cache.cleanup();
            trace!(removed, "Cache cleanup tick");
        }
    });

    CleanupTask { handle }
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Start the cleanup task if the configuration enables it.
    pub fn start_cleanup_task(&self) -> Option<CleanupTask> {
        if !self.config.enable_cleanup_task {
            return None;
        }
        Some(spawn_cleanup_task(self.clone(), self.config.cleanup_interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use curbside_types::ManualClock;

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task_sweeps_on_interval() {
        let clock = ManualClock::new(0);
        let cache: MemoryCache<u32> = MemoryCache::with_clock(CacheConfig::new(), clock.shared());
        cache.set("a", 1, Duration::from_secs(1), None);
        cache.set("b", 2, Duration::from_secs(600), None);

        let task = spawn_cleanup_task(cache.clone(), Duration::from_secs(30));
        clock.advance(Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(cache.len(), 1);
        assert!(cache.has("b"));

        task.stop();
    }

    #[tokio::test]
    async fn test_disabled_cleanup_task() {
        let cache: MemoryCache<u32> = MemoryCache::new(CacheConfig::new().with_cleanup_task(false));
        assert!(cache.start_cleanup_task().is_none());
    }
}
