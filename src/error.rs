//! Error types for the cache
//!
//! Cache operations themselves never fail; errors only arise when building a
//! cache or loading its configuration.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for cache construction and configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// No Tokio runtime is available to host the reaper task
    #[error("no Tokio runtime available: the cache must be created from within a runtime context")]
    NoRuntime,

    /// A configuration value could not be parsed
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
