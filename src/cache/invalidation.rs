//! Group invalidation records
//!
//! Write paths call [`QueryCache::invalidate_group`](crate::cache::QueryCache::invalidate_group)
//! after a mutation; each call yields an [`InvalidationEvent`] describing what
//! was cleared. Which groups a write affects is the caller's decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reason for cache invalidation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// Whole group cleared on request
    Group,

    /// A single query's entry dropped
    Entry { key: String },
}

impl std::fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidationReason::Group => write!(f, "group invalidation"),
            InvalidationReason::Entry { key } => write!(f, "entry invalidation: {}", key),
        }
    }
}

/// Event for cache invalidation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Group that was touched, `None` for a flat entry
    pub group: Option<String>,

    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// Whether anything was actually removed
    pub removed: bool,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,
}

impl InvalidationEvent {
    /// Record the clearing of a whole group
    pub fn group(group: impl Into<String>, removed: bool) -> Self {
        Self {
            group: Some(group.into()),
            reason: InvalidationReason::Group,
            removed,
            timestamp: Utc::now(),
        }
    }

    /// Record the removal of one entry
    pub fn entry(group: Option<String>, key: impl Into<String>, removed: bool) -> Self {
        Self {
            group,
            reason: InvalidationReason::Entry { key: key.into() },
            removed,
            timestamp: Utc::now(),
        }
    }
}
