//! Cache Module
//!
//! Provides a concurrent in-memory cache with TTL expiration and eviction
//! callbacks.

mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::Cache;

pub(crate) use store::CacheInner;
