//! Domain model binding for cached query results
//!
//! A [`Model`] is any serde-serializable type tied to one logical collection.
//! Query results are either a single instance or an ordered list of them,
//! represented by [`QueryResult`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A domain type stored in a named collection of the backing data store.
///
/// Models must serialize to a JSON object. Fields marked `#[serde(skip)]` are
/// not persisted in the cache and come back as their `Default` after a hit.
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Name of the collection this model is read from
    const COLLECTION: &'static str;
}

/// Result of a read query: one model instance or an ordered list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryResult<M> {
    /// Single-document result (e.g. lookup by id)
    One(M),

    /// Multi-document result, in the order the data source returned it
    Many(Vec<M>),
}

impl<M> QueryResult<M> {
    /// Number of model instances in the result
    pub fn len(&self) -> usize {
        match self {
            QueryResult::One(_) => 1,
            QueryResult::Many(items) => items.len(),
        }
    }

    /// Whether the result holds no instances (only possible for an empty list)
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether this is a single-item result
    pub fn is_one(&self) -> bool {
        matches!(self, QueryResult::One(_))
    }

    /// Borrow the single item, if this is a single-item result
    pub fn as_one(&self) -> Option<&M> {
        match self {
            QueryResult::One(item) => Some(item),
            QueryResult::Many(_) => None,
        }
    }

    /// Borrow the list, if this is a multi-item result
    pub fn as_many(&self) -> Option<&[M]> {
        match self {
            QueryResult::One(_) => None,
            QueryResult::Many(items) => Some(items),
        }
    }

    /// Flatten into a vector regardless of shape
    pub fn into_vec(self) -> Vec<M> {
        match self {
            QueryResult::One(item) => vec![item],
            QueryResult::Many(items) => items,
        }
    }
}

impl<M> From<M> for QueryResult<M> {
    fn from(item: M) -> Self {
        QueryResult::One(item)
    }
}

impl<M> From<Vec<M>> for QueryResult<M> {
    fn from(items: Vec<M>) -> Self {
        QueryResult::Many(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: u64,
        status: String,
    }

    impl Model for Order {
        const COLLECTION: &'static str = "orders";
    }

    fn order(id: u64) -> Order {
        Order {
            id,
            status: "open".to_string(),
        }
    }

    #[test]
    fn test_result_shapes() {
        let one = QueryResult::from(order(1));
        assert!(one.is_one());
        assert_eq!(one.len(), 1);
        assert_eq!(one.as_one().map(|o| o.id), Some(1));
        assert!(one.as_many().is_none());

        let many: QueryResult<Order> = QueryResult::from(vec![order(1), order(2)]);
        assert!(!many.is_one());
        assert_eq!(many.len(), 2);
        assert_eq!(many.as_many().map(|m| m.len()), Some(2));
    }

    #[test]
    fn test_empty_list() {
        let empty: QueryResult<Order> = QueryResult::Many(Vec::new());
        assert!(empty.is_empty());
        assert!(empty.into_vec().is_empty());
    }

    #[test]
    fn test_untagged_serialization() {
        let one = serde_json::to_string(&QueryResult::One(order(1))).unwrap();
        assert_eq!(one, r#"{"id":1,"status":"open"}"#);

        let many = serde_json::to_string(&QueryResult::Many(vec![order(1)])).unwrap();
        assert_eq!(many, r#"[{"id":1,"status":"open"}]"#);
    }

    #[test]
    fn test_collection_binding() {
        assert_eq!(Order::COLLECTION, "orders");
    }
}
