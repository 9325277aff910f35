//! Entries held by the in-process store

use crate::cache::types::CacheValue;
use std::time::Duration;
use tokio::time::Instant;

/// A stored value with an optional expiry deadline
///
/// Deadlines use tokio's clock so paused-time tests can move past them
/// without sleeping.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value
    pub value: CacheValue,

    /// When the entry stops being served; `None` never expires
    pub expires_at: Option<Instant>,
}

impl CacheEntry {
    /// Create an entry that expires `ttl` from now, or never when `ttl` is `None`
    pub fn new(value: CacheValue, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    /// Check if the entry has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|deadline| Instant::now() >= deadline)
            .unwrap_or(false)
    }

    /// Get time until expiration, `None` for entries without a deadline or already expired
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let deadline = self.expires_at?;
        deadline
            .checked_duration_since(Instant::now())
            .filter(|left| !left.is_zero())
    }

    /// Approximate size of the entry in bytes
    pub fn size_bytes(&self) -> usize {
        self.value.len() + std::mem::size_of::<Self>()
    }
}
