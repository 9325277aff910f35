//! Cache key derivation
//!
//! A key is the canonical JSON encoding of the query's collection and filter:
//!
//! ```text
//! {"collection":"orders","filter":{"status":"open"}}
//! ```
//!
//! Filter fields are sorted and nested objects canonicalized (see
//! [`Filter`]), so logically equal filters always produce the same key. The
//! collection sits beside the filter rather than inside it, which keeps a
//! filter field named `collection` from colliding with the collection name.

use crate::cache::types::CacheKey;
use crate::query::{Filter, Query};
use serde::Serialize;

#[derive(Serialize)]
struct KeyShape<'a> {
    collection: &'a str,
    filter: &'a Filter,
}

/// Derive the cache key for a filter over a collection
pub fn derive_key(filter: &Filter, collection: &str) -> CacheKey {
    let shape = KeyShape { collection, filter };
    // A map of strings to JSON values always serializes.
    let raw = serde_json::to_string(&shape).unwrap_or_default();
    CacheKey::from_raw(raw)
}

/// Derive the cache key for a query descriptor
pub fn key_for(query: &Query) -> CacheKey {
    derive_key(query.predicate(), query.collection())
}
