//! Read query descriptors
//!
//! A [`Query`] is an immutable value describing one read: the target
//! collection, an equality [`Filter`], and the caller's caching intent. It is
//! built fresh for every call, so caching flags are never shared between
//! concurrent queries.

use crate::model::Model;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Structural equality filter: field -> value every matching document must hold
///
/// Fields are kept sorted, and nested objects are canonicalized on insert,
/// so two filters with the same content compare and serialize identically
/// regardless of how they were built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(BTreeMap<String, Value>);

impl Filter {
    /// Create an empty filter (matches every document)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an equality condition
    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), canonicalize(value.into()));
        self
    }

    /// Build a filter from a JSON object
    ///
    /// Returns `None` if `value` is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(
                map.into_iter()
                    .map(|(field, value)| (field, canonicalize(value)))
                    .collect(),
            )),
            _ => None,
        }
    }

    /// Look up the value a field must match
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Iterate conditions in canonical (sorted) order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of conditions
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the filter has no conditions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check a JSON document against every condition
    pub fn matches(&self, document: &Value) -> bool {
        self.0.iter().all(|(field, expected)| {
            document
                .get(field)
                .map(|actual| canonicalize(actual.clone()) == *expected)
                .unwrap_or(false)
        })
    }
}

/// Rebuild nested objects with their keys in sorted order
pub(crate) fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, canonicalize(v)))
                .collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Per-query caching intent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheDirective {
    /// Invalidation group (hash namespace); `None` means flat mode
    pub group: Option<String>,

    /// TTL override for this query only
    pub ttl: Option<Duration>,
}

/// Where a cached query's entry lives in the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode<'a> {
    /// Global key space, plain get/set
    Flat,

    /// Field of the named group hash
    Grouped(&'a str),
}

/// Immutable read query descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    collection: String,
    filter: Filter,
    caching: Option<CacheDirective>,
}

impl Query {
    /// Create an uncached query over every document in `collection`
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            filter: Filter::new(),
            caching: None,
        }
    }

    /// Create an uncached query over the collection bound to `M`
    pub fn for_model<M: Model>() -> Self {
        Self::new(M::COLLECTION)
    }

    /// Add an equality condition to the filter
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter = self.filter.eq(field, value);
        self
    }

    /// Replace the whole filter
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Mark the query cache-eligible in flat mode
    pub fn cache(mut self) -> Self {
        self.caching.get_or_insert_with(CacheDirective::default);
        self
    }

    /// Mark the query cache-eligible and file its entry under `group`
    pub fn cache_in(mut self, group: impl Into<String>) -> Self {
        self.caching.get_or_insert_with(CacheDirective::default).group = Some(group.into());
        self
    }

    /// Mark the query cache-eligible with a TTL override
    pub fn cache_for(mut self, ttl: Duration) -> Self {
        self.caching.get_or_insert_with(CacheDirective::default).ttl = Some(ttl);
        self
    }

    /// Target collection name
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Equality filter
    pub fn predicate(&self) -> &Filter {
        &self.filter
    }

    /// Whether the caller opted this query into caching
    pub fn is_cached(&self) -> bool {
        self.caching.is_some()
    }

    /// Caching directive, if any
    pub fn directive(&self) -> Option<&CacheDirective> {
        self.caching.as_ref()
    }

    /// Invalidation group, if caching is enabled and grouped
    pub fn group(&self) -> Option<&str> {
        self.caching.as_ref()?.group.as_deref()
    }

    /// Storage mode, or `None` when caching is disabled
    pub fn cache_mode(&self) -> Option<CacheMode<'_>> {
        let directive = self.caching.as_ref()?;
        Some(match directive.group.as_deref() {
            Some(group) => CacheMode::Grouped(group),
            None => CacheMode::Flat,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_defaults_to_uncached() {
        let query = Query::new("orders").filter("status", "open");
        assert!(!query.is_cached());
        assert!(query.cache_mode().is_none());
        assert_eq!(query.collection(), "orders");
        assert_eq!(query.predicate().get("status"), Some(&json!("open")));
    }

    #[test]
    fn test_cache_modes() {
        let flat = Query::new("orders").cache();
        assert_eq!(flat.cache_mode(), Some(CacheMode::Flat));
        assert_eq!(flat.group(), None);

        let grouped = Query::new("orders").cache_in("user:42");
        assert_eq!(grouped.cache_mode(), Some(CacheMode::Grouped("user:42")));

        let ttl = Query::new("orders").cache_in("g").cache_for(Duration::from_secs(30));
        assert_eq!(ttl.group(), Some("g"));
        assert_eq!(ttl.directive().and_then(|d| d.ttl), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_builders_do_not_alias() {
        let base = Query::new("orders").filter("status", "open");
        let cached = base.clone().cache_in("orders");
        assert!(!base.is_cached());
        assert!(cached.is_cached());
    }

    #[test]
    fn test_filter_insertion_order_is_irrelevant() {
        let a = Filter::new().eq("a", 1).eq("b", 2);
        let b = Filter::new().eq("b", 2).eq("a", 1);
        assert_eq!(a, b);
        let fields: Vec<&String> = a.iter().map(|(k, _)| k).collect();
        assert_eq!(fields, vec!["a", "b"]);
    }

    #[test]
    fn test_filter_from_value() {
        let filter =
            Filter::from_value(json!({"status": "open", "meta": {"z": 1, "a": 2}})).unwrap();
        assert_eq!(filter.len(), 2);
        assert_eq!(
            serde_json::to_string(filter.get("meta").unwrap()).unwrap(),
            r#"{"a":2,"z":1}"#
        );
        assert!(Filter::from_value(json!([1, 2])).is_none());
    }

    #[test]
    fn test_filter_matches() {
        let filter = Filter::new().eq("status", "open").eq("owner", json!({"id": 7}));
        assert!(filter.matches(&json!({"id": 1, "status": "open", "owner": {"id": 7}})));
        assert!(!filter.matches(&json!({"id": 2, "status": "closed", "owner": {"id": 7}})));
        assert!(!filter.matches(&json!({"id": 3})));
        assert!(Filter::new().matches(&json!({"anything": true})));
    }
}
