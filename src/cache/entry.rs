//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with an optional deadline.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A stored value plus its optional absolute expiration deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Absolute deadline, None = no expiration
    pub expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    // == Constructors ==
    /// Creates an entry that never expires.
    pub fn new(value: V) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    /// Creates an entry whose deadline is `now + ttl`.
    ///
    /// A zero `ttl` puts the deadline at the current instant, so the entry reads
    /// as expired as soon as any time has passed. A `ttl` too large to represent
    /// as an `Instant` yields an entry that never expires.
    pub fn with_ttl(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now().checked_add(ttl),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired only once the current time is strictly after its
    /// deadline. Reads, deletes and the reaper sweep all go through this check.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`is_expired`](Self::is_expired) against a caller-supplied clock.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(deadline) => now > deadline,
            None => false,
        }
    }

    // == Time To Live ==
    /// Returns the time left before the deadline, or None if the entry never expires.
    ///
    /// Returns `Some(Duration::ZERO)` once the deadline has passed.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.expires_at
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }
}
