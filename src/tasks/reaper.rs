//! Reaper Task
//!
//! Background task that periodically sweeps expired cache entries.

use std::sync::Weak;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::cache::CacheInner;

/// Spawns the reaper for one cache on the given runtime.
///
/// The task sleeps for `interval` between sweeps. It holds only a weak
/// reference to the cache and stops when:
/// - `true` is sent on the shutdown channel, or the sender is dropped
/// - every cache handle has been dropped
///
/// `interval` must be non-zero.
pub(crate) fn spawn_reaper<V>(
    runtime: &Handle,
    cache: Weak<CacheInner<V>>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    V: Send + Sync + 'static,
{
    runtime.spawn(async move {
        info!("Starting cache reaper with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; sweeps start one interval in
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let Some(inner) = cache.upgrade() else {
                        debug!("Cache dropped, stopping reaper");
                        break;
                    };

                    let removed = inner.delete_expired();
                    if removed > 0 {
                        info!("Cache reaper: removed {} expired entries", removed);
                    } else {
                        debug!("Cache reaper: no expired entries found");
                    }
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Cache reaper stopped");
    })
}
