//! Configuration Module
//!
//! Handles loading cache configuration from environment variables.

use std::env;
use std::time::Duration;

use serde::Serialize;

use crate::error::{CacheError, Result};

/// Interval used by the reaper when none (or zero) is configured.
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Environment variable holding the sweep interval in milliseconds.
pub const CLEANUP_INTERVAL_ENV: &str = "CACHE_CLEANUP_INTERVAL_MS";

/// Cache configuration parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheConfig {
    /// Interval between reaper sweeps. Zero selects [`DEFAULT_CLEANUP_INTERVAL`].
    pub cleanup_interval: Duration,
}

impl CacheConfig {
    /// Creates a config with the given sweep interval.
    pub fn new(cleanup_interval: Duration) -> Self {
        Self { cleanup_interval }
    }

    /// Loads the config from the environment, falling back to defaults for
    /// missing or malformed values.
    ///
    /// # Environment Variables
    /// - `CACHE_CLEANUP_INTERVAL_MS` - Sweep interval in milliseconds (default: 60000)
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_default()
    }

    /// Loads the config from the environment, rejecting malformed values.
    pub fn try_from_env() -> Result<Self> {
        let cleanup_interval = match env::var(CLEANUP_INTERVAL_ENV) {
            Ok(raw) => {
                let millis: u64 = raw.trim().parse().map_err(|_| {
                    CacheError::InvalidConfig(format!(
                        "{} must be a whole number of milliseconds, got {:?}",
                        CLEANUP_INTERVAL_ENV, raw
                    ))
                })?;
                Duration::from_millis(millis)
            }
            Err(_) => DEFAULT_CLEANUP_INTERVAL,
        };

        Ok(Self { cleanup_interval })
    }

    /// Returns the interval the reaper actually runs at.
    pub fn effective_cleanup_interval(&self) -> Duration {
        if self.cleanup_interval.is_zero() {
            DEFAULT_CLEANUP_INTERVAL
        } else {
            self.cleanup_interval
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}
