//! Core type definitions for the cache system

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key derived from a query's shape
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already-derived key string
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Borrow the key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the key, returning the underlying string
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Cache value type - the JSON-serialized query result
pub type CacheValue = String;

/// Statistics for the query interception layer
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Queries answered from the cache
    pub hits: u64,

    /// Cache-enabled queries that had to run against the data source
    pub misses: u64,

    /// Queries that were not cache-enabled and passed straight through
    pub bypassed: u64,

    /// Successful write-backs after a miss
    pub writes: u64,

    /// Store operations that failed (unreachable, timed out, rejected)
    pub store_errors: u64,

    /// Stored values that failed to hydrate
    pub malformed_entries: u64,

    /// Group invalidations performed
    pub invalidations: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage of cache-enabled queries
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }

    /// Calculate miss rate as a percentage
    pub fn miss_rate(&self) -> f64 {
        100.0 - self.hit_rate()
    }

    /// Total cache-enabled lookups
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, bypassed: {}, writes: {}, store_errors: {}, malformed: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.bypassed,
            self.writes,
            self.store_errors,
            self.malformed_entries
        )
    }
}
