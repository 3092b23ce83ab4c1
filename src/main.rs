//! ttl_cache demo - runs a cache with a logging eviction callback
//!
//! Seeds a handful of entries with staggered TTLs, then lets the reaper sweep
//! them until Ctrl+C. Set `RUST_LOG=ttl_cache=debug` to watch every sweep.

use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ttl_cache::{Cache, CacheConfig};

/// Number of entries seeded at startup.
const DEMO_ENTRIES: u64 = 5;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = CacheConfig::try_from_env().context("failed to load cache configuration")?;
    info!(
        "Configuration loaded: cleanup_interval={:?}",
        config.effective_cleanup_interval()
    );

    let cache: Cache<String> =
        Cache::with_config(&config).context("failed to start cache")?;
    cache.set_on_evicted(|key, value| {
        info!(key = %key, value = %value, "Entry evicted");
    });

    cache.set("pinned", "never expires".to_string());
    for i in 1..=DEMO_ENTRIES {
        cache.set_with_expiration(
            format!("session-{}", i),
            format!("token-{}", i),
            Duration::from_secs(i * 2),
        );
    }
    info!("Seeded {} entries, waiting for Ctrl+C", cache.len());

    signal::ctrl_c()
        .await
        .context("failed to install Ctrl+C handler")?;

    info!("Received Ctrl+C, shutting down");
    cache.shutdown().await;

    let stats = cache.stats();
    info!(
        "Shutdown complete: expirations={}, sweeps={}, remaining={}",
        stats.expirations, stats.sweeps, stats.total_entries
    );
    Ok(())
}
