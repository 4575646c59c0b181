//! Read strategies composed from the cache primitives.
//!
//! - [`MemoryCache::with_cache`]: read-through with a plain TTL
//! - [`MemoryCache::with_swr`]: stale-while-revalidate
//! - [`MemoryCache::prefetch`]: warm a key without reading it
//!
//! None of these de-duplicate concurrent cold misses for the same key: both
//! fetches run and the last `set` wins.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::cache::MemoryCache;
use crate::entry::CacheEntry;

/// Callback invoked with the fresh value after a successful revalidation.
pub type RevalidateCallback<V> = Arc<dyn Fn(&V) + Send + Sync>;

/// Options for [`MemoryCache::with_swr`].
pub struct SwrOptions<V> {
    /// Absolute lifetime of the stored entry.
    pub ttl: Duration,

    /// Age after which a read triggers a background refresh.
    pub stale_time: Duration,

    /// Called after a background refresh has replaced the entry.
    pub on_revalidate: Option<RevalidateCallback<V>>,
}

impl<V> SwrOptions<V> {
    pub fn new(ttl: Duration, stale_time: Duration) -> Self {
        Self {
            ttl,
            stale_time,
            on_revalidate: None,
        }
    }

    /// Register a callback for completed revalidations.
    pub fn on_revalidate(mut self, callback: impl Fn(&V) + Send + Sync + 'static) -> Self {
        self.on_revalidate = Some(Arc::new(callback));
        self
    }
}

impl<V> Clone for SwrOptions<V> {
    fn clone(&self) -> Self {
        Self {
            ttl: self.ttl,
            stale_time: self.stale_time,
            on_revalidate: self.on_revalidate.clone(),
        }
    }
}

impl<V> std::fmt::Debug for SwrOptions<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwrOptions")
            .field("ttl", &self.ttl)
            .field("stale_time", &self.stale_time)
            .field("on_revalidate", &self.on_revalidate.is_some())
            .finish()
    }
}

impl<V> MemoryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Return the cached value, or fetch, store and return it.
    ///
    /// Fetch errors propagate to the caller and nothing is stored.
    pub async fn with_cache<F, Fut, E>(&self, key: &str, fetch: F, ttl: Duration) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }

        let value = fetch().await?;
        self.set(key, value.clone(), ttl, None);
        Ok(value)
    }

    /// Stale-while-revalidate read.
    ///
    /// A non-expired entry is returned immediately. If it is past
    /// `stale_time`, `fetch` runs on a background task; on success the
    /// entry is replaced and `on_revalidate` is called, on failure the error
    /// is logged and the stale value stays in place. On a cold miss `fetch`
    /// runs inline and its error propagates.
    pub async fn with_swr<F, Fut, E>(
        &self,
        key: &str,
        fetch: F,
        options: SwrOptions<V>,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        if let Some(read) = self.get_stale(key) {
            if read.is_stale {
                self.spawn_revalidation(key, fetch, options);
            }
            return Ok(read.value);
        }

        let value = fetch().await?;
        self.set(key, value.clone(), options.ttl, Some(options.stale_time));
        Ok(value)
    }

    /// Fetch and store `key` only if it is not currently cached.
    pub async fn prefetch<F, Fut, E>(&self, key: &str, fetch: F, ttl: Duration) -> Result<(), E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if self.has(key) {
            trace!(key = %key, "Prefetch skipped, already cached");
            return Ok(());
        }

        let value = fetch().await?;
        self.set(key, value, ttl, None);
        debug!(key = %key, "Prefetched cache entry");
        Ok(())
    }

    fn spawn_revalidation<F, Fut, E>(&self, key: &str, fetch: F, options: SwrOptions<V>)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!(key = %key, "No tokio runtime, skipping background revalidation");
            return;
        };

        let token = {
            let mut inner = self.inner.lock();
            if inner.revalidating.contains_key(key) {
                trace!(key = %key, "Revalidation already in flight");
                return;
            }
            inner.next_token += 1;
            let token = inner.next_token;
            inner.revalidating.insert(key.to_string(), token);
            token
        };

        debug!(key = %key, "Entry is stale, revalidating in background");

        let cache = self.clone();
        let key = key.to_string();
        runtime.spawn(async move {
            let result = fetch().await;
            cache.finish_revalidation(&key, token, result, options);
        });
    }

    fn finish_revalidation<E: Display>(
        &self,
        key: &str,
        token: u64,
        result: Result<V, E>,
        options: SwrOptions<V>,
    ) {
        let value = {
            let mut inner = self.inner.lock();
            if inner.revalidating.get(key) != Some(&token) {
                debug!(key = %key, "Entry invalidated during revalidation, dropping result");
                return;
            }
            inner.revalidating.remove(key);

            let value = match result {
                Ok(value) => value,
                Err(e) => {
                    warn!(key = %key, error = %e, "Background revalidation failed, keeping stale value");
                    return;
                }
            };

            let entry = CacheEntry::new(
                value.clone(),
                self.now_ms(),
                options.ttl,
                Some(options.stale_time),
            );
            inner.insert(key, entry, self.config.max_size);
            value
        };

        debug!(key = %key, "Background revalidation complete");
        if let Some(callback) = options.on_revalidate {
            callback(&value);
        }
    }
}
