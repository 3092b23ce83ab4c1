//! ttl_cache - A concurrent in-process key-value cache
//!
//! Entries may carry a time-to-live. Expired entries are hidden from reads
//! immediately and removed by a background reaper task, which reports each
//! removal to an optional eviction callback.

pub mod cache;
pub mod config;
pub mod error;
mod tasks;

pub use cache::{Cache, CacheEntry, CacheStats};
pub use config::CacheConfig;
pub use error::{CacheError, Result};
