//! Serialization and hydration of query results
//!
//! Results are stored as plain JSON: a single item as an object, a list as an
//! array. Hydration inspects the parsed shape to decide which
//! [`QueryResult`] variant to rebuild.

use crate::cache::types::CacheValue;
use crate::error::{CacheError, Result};
use crate::model::{Model, QueryResult};
use serde_json::Value;

/// Encode a query result for storage
pub fn serialize<M: Model>(result: &QueryResult<M>) -> Result<CacheValue> {
    serde_json::to_string(result).map_err(|e| CacheError::SerializationError(e.to_string()))
}

/// Rebuild model objects from a stored value
///
/// Arrays become [`QueryResult::Many`] with order preserved, objects become
/// [`QueryResult::One`]. Any other shape, or an element that does not fit
/// `M`, is a [`CacheError::MalformedEntry`].
pub fn hydrate<M: Model>(raw: &str) -> Result<QueryResult<M>> {
    let value: Value =
        serde_json::from_str(raw).map_err(|e| CacheError::MalformedEntry(e.to_string()))?;

    match value {
        Value::Array(items) => items
            .into_iter()
            .map(from_document::<M>)
            .collect::<Result<Vec<M>>>()
            .map(QueryResult::Many),
        document @ Value::Object(_) => from_document::<M>(document).map(QueryResult::One),
        other => Err(CacheError::MalformedEntry(format!(
            "expected object or array, found {}",
            json_kind(&other)
        ))),
    }
}

fn from_document<M: Model>(document: Value) -> Result<M> {
    serde_json::from_value(document).map_err(|e| {
        CacheError::MalformedEntry(format!("cannot hydrate {}: {}", M::COLLECTION, e))
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
