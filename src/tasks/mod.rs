//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of a cache.
//!
//! # Tasks
//! - Reaper: Removes expired cache entries at the configured interval

mod reaper;

pub(crate) use reaper::spawn_reaper;
