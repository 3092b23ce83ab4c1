//! Cache Store Module
//!
//! Main cache engine combining sharded concurrent storage, TTL expiration and
//! eviction notification.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::cache::stats::StatsRecorder;
use crate::cache::{CacheEntry, CacheStats};
use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::tasks::spawn_reaper;

/// Hook invoked with the key and value of every entry removed by an explicit
/// delete or by a reaper sweep.
pub(crate) type EvictionCallback<V> = Arc<dyn Fn(&str, V) + Send + Sync>;

// == Shared State ==
/// State shared by every [`Cache`] handle and, weakly, by the reaper task.
pub(crate) struct CacheInner<V> {
    entries: DashMap<String, CacheEntry<V>>,
    on_evicted: RwLock<Option<EvictionCallback<V>>>,
    stats: StatsRecorder,
    cleanup_interval: Duration,
    shutdown_tx: watch::Sender<bool>,
    reaper: Mutex<Option<JoinHandle<()>>>,
}

impl<V> CacheInner<V> {
    /// Clones the registered callback out of its slot so the lock is released
    /// before the callback runs.
    fn eviction_callback(&self) -> Option<EvictionCallback<V>> {
        self.on_evicted.read().clone()
    }

    // == Delete Expired ==
    /// Removes every expired entry, then notifies the callback once per removed
    /// entry. Returns the number of entries removed.
    ///
    /// Keys are collected before anything is removed, since removing while
    /// iterating would deadlock on the shard being iterated. Each removal
    /// re-checks expiration so an entry overwritten mid-sweep survives.
    pub(crate) fn delete_expired(&self) -> usize {
        let now = Instant::now();
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|item| item.value().is_expired_at(now))
            .map(|item| item.key().clone())
            .collect();

        let evicted: Vec<(String, CacheEntry<V>)> = expired_keys
            .into_iter()
            .filter_map(|key| self.entries.remove_if(&key, |_, entry| entry.is_expired()))
            .collect();

        let count = evicted.len();
        self.stats.record_sweep(count);

        if let Some(callback) = self.eviction_callback() {
            for (key, entry) in evicted {
                let notified =
                    panic::catch_unwind(AssertUnwindSafe(|| callback(&key, entry.value)));
                if let Err(payload) = notified {
                    error!(
                        key = %key,
                        "Eviction callback panicked during sweep: {}",
                        panic_message(&*payload)
                    );
                }
            }
        }

        count
    }
}

/// Extracts the message from a caught panic payload.
fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

// == Cache ==
/// Concurrent key-value cache with optional per-entry TTL.
///
/// Handles are cheap to clone and all point at the same storage. Creating a
/// cache spawns a reaper task on the current Tokio runtime that sweeps expired
/// entries every `cleanup_interval`. The reaper stops on [`close`](Self::close),
/// on [`shutdown`](Self::shutdown), or once every handle has been dropped.
///
/// Reads check expiration lazily, so an expired entry is never returned even
/// before the reaper has removed it.
///
/// # Eviction callback
/// The callback registered with [`set_on_evicted`](Self::set_on_evicted) runs
/// after the entry has left the map and after the callback slot is unlocked, so
/// it may call back into the cache. It runs on the reaper task for sweeps and on
/// the caller's thread for deletes, and must not block for long. Overwriting a
/// key with `set` never fires it.
///
/// A callback that captures a `Cache` clone keeps the storage and the reaper
/// alive through that clone, so dropping the other handles no longer stops the
/// reaper. Call [`close`](Self::close) or
/// [`clear_on_evicted`](Self::clear_on_evicted) when done with such a cache.
pub struct Cache<V> {
    inner: Arc<CacheInner<V>>,
}

impl<V> Clone for Cache<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Cache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("entries", &self.inner.entries.len())
            .field("cleanup_interval", &self.inner.cleanup_interval)
            .field("closed", &*self.inner.shutdown_tx.borrow())
            .finish()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache whose reaper sweeps every `cleanup_interval`.
    /// A zero interval selects the one minute default.
    ///
    /// # Panics
    /// Panics if called outside of a Tokio runtime context. Use
    /// [`try_new`](Self::try_new) to get an error instead.
    pub fn new(cleanup_interval: Duration) -> Self {
        match Self::try_new(cleanup_interval) {
            Ok(cache) => cache,
            Err(err) => panic!("{}", err),
        }
    }

    /// Creates a cache, returning [`CacheError::NoRuntime`] when no Tokio
    /// runtime is available for the reaper.
    pub fn try_new(cleanup_interval: Duration) -> Result<Self> {
        Self::with_config(&CacheConfig::new(cleanup_interval))
    }

    /// Creates a cache from a loaded [`CacheConfig`].
    pub fn with_config(config: &CacheConfig) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|_| CacheError::NoRuntime)?;
        let cleanup_interval = config.effective_cleanup_interval();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let inner = Arc::new(CacheInner {
            entries: DashMap::new(),
            on_evicted: RwLock::new(None),
            stats: StatsRecorder::default(),
            cleanup_interval,
            shutdown_tx,
            reaper: Mutex::new(None),
        });

        let handle = spawn_reaper(
            &runtime,
            Arc::downgrade(&inner),
            cleanup_interval,
            shutdown_rx,
        );
        *inner.reaper.lock() = Some(handle);

        Ok(Self { inner })
    }

    // == Set ==
    /// Stores a value that never expires, replacing any existing entry.
    pub fn set(&self, key: impl Into<String>, data: V) {
        self.inner.entries.insert(key.into(), CacheEntry::new(data));
    }

    /// Stores a value that expires `ttl` from now, replacing any existing entry.
    ///
    /// A zero `ttl` is accepted and makes the entry expire essentially
    /// immediately: the next read after any time has passed misses.
    pub fn set_with_expiration(&self, key: impl Into<String>, data: V, ttl: Duration) {
        self.inner
            .entries
            .insert(key.into(), CacheEntry::with_ttl(data, ttl));
    }

    // == Get ==
    /// Returns a clone of the value if the key is present and not expired.
    ///
    /// Expired entries are left in place for the reaper.
    pub fn get(&self, key: &str) -> Option<V> {
        let value = self.inner.entries.get(key).and_then(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.value.clone())
            }
        });

        match value {
            Some(_) => self.inner.stats.record_hit(),
            None => self.inner.stats.record_miss(),
        }
        value
    }

    /// Returns the time left before the key expires.
    ///
    /// `None` if the key is absent or expired, `Some(None)` if it never expires.
    pub fn expires_in(&self, key: &str) -> Option<Option<Duration>> {
        let entry = self.inner.entries.get(key)?;
        if entry.is_expired() {
            return None;
        }
        Some(entry.ttl_remaining())
    }

    // == Delete ==
    /// Removes a live entry and passes it to the eviction callback, if one is
    /// registered.
    ///
    /// Returns `false` without touching anything when the key is absent or
    /// already expired; expired entries are left for the reaper to remove and
    /// report.
    pub fn delete(&self, key: &str) -> bool {
        let Some((key, entry)) = self
            .inner
            .entries
            .remove_if(key, |_, entry| !entry.is_expired())
        else {
            return false;
        };

        self.inner.stats.record_deletion();
        debug!(key = %key, "Deleted cache entry");

        if let Some(callback) = self.inner.eviction_callback() {
            callback(&key, entry.value);
        }
        true
    }

    // == Delete Expired ==
    /// Runs one sweep immediately and returns the number of entries removed.
    ///
    /// The reaper calls the same routine on every tick.
    pub fn delete_expired(&self) -> usize {
        self.inner.delete_expired()
    }

    // == Eviction Callback ==
    /// Registers the eviction callback, replacing any previous one.
    ///
    /// A panic raised by the callback during a sweep is caught and logged, and
    /// the remaining entries of that sweep are still reported; the reaper keeps
    /// running. A panic raised during [`delete`](Self::delete) propagates to the
    /// caller after the entry has been removed.
    pub fn set_on_evicted<F>(&self, callback: F)
    where
        F: Fn(&str, V) + Send + Sync + 'static,
    {
        *self.inner.on_evicted.write() = Some(Arc::new(callback));
    }

    /// Removes the eviction callback.
    pub fn clear_on_evicted(&self) {
        *self.inner.on_evicted.write() = None;
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.stats.snapshot(self.inner.entries.len())
    }

    // == Length ==
    /// Returns the number of stored entries, including expired entries the
    /// reaper has not removed yet.
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    /// Interval the reaper sweeps at.
    pub fn cleanup_interval(&self) -> Duration {
        self.inner.cleanup_interval
    }

    // == Lifecycle ==
    /// Signals the reaper to stop at its next wakeup.
    ///
    /// The cache stays usable afterwards; expired entries are then only hidden
    /// by reads and removed by explicit [`delete_expired`](Self::delete_expired).
    pub fn close(&self) {
        self.inner.shutdown_tx.send_replace(true);
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.inner.shutdown_tx.borrow()
    }

    /// Closes the cache and waits for the reaper task to finish.
    pub async fn shutdown(&self) {
        self.close();

        let handle = self.inner.reaper.lock().take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                warn!("Reaper task ended abnormally: {}", err);
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn inner_for_tests(&self) -> Arc<CacheInner<V>> {
        Arc::clone(&self.inner)
    }
}
