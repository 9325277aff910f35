//! Error types for cache operations
//!
//! This module defines the error type used by the cache stores, the codec and
//! the invalidation API. The interception layer never hands these to the
//! caller of a query; they are logged and the query falls through to the
//! backing data source.

use thiserror::Error;

/// Main error type for cache operations
#[derive(Error, Debug)]
pub enum CacheError {
    /// Connection error - the cache store could not be reached at connect time
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The cache store rejected or dropped a request
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Operation timeout
    #[error("Operation timed out after {timeout_ms}ms: {context}")]
    TimeoutError { timeout_ms: u64, context: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error while encoding a result for storage
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A stored value could not be hydrated back into model objects
    #[error("Malformed cache entry: {0}")]
    MalformedEntry(String),

    /// Redis driver error (wrapper)
    #[error("Redis driver error: {0}")]
    DriverError(#[from] redis::RedisError),

    /// Generic error with context
    #[error("Error: {0}")]
    Other(String),
}

impl CacheError {
    /// Whether the error means the store could not serve the request at all
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            CacheError::ConnectionError(_)
                | CacheError::StoreUnavailable(_)
                | CacheError::TimeoutError { .. }
                | CacheError::DriverError(_)
        )
    }
}

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, CacheError>;

impl From<String> for CacheError {
    fn from(s: String) -> Self {
        CacheError::Other(s)
    }
}

impl From<&str> for CacheError {
    fn from(s: &str) -> Self {
        CacheError::Other(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CacheError::StoreUnavailable("connection reset".to_string());
        assert_eq!(error.to_string(), "Store unavailable: connection reset");

        let timeout_error = CacheError::TimeoutError {
            timeout_ms: 250,
            context: "HGET orders".to_string(),
        };
        assert!(timeout_error.to_string().contains("timed out after 250ms"));

        let malformed = CacheError::MalformedEntry("expected object or array".to_string());
        assert!(malformed.to_string().starts_with("Malformed cache entry"));
    }

    #[test]
    fn test_error_conversion() {
        let error: CacheError = "test error".into();
        assert!(matches!(error, CacheError::Other(_)));

        let error: CacheError = "test error".to_string().into();
        assert!(matches!(error, CacheError::Other(_)));
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(CacheError::StoreUnavailable("down".into()).is_unavailable());
        assert!(CacheError::TimeoutError {
            timeout_ms: 1,
            context: "GET".into()
        }
        .is_unavailable());
        assert!(!CacheError::MalformedEntry("bad".into()).is_unavailable());
        assert!(!CacheError::ConfigError("bad".into()).is_unavailable());
    }
}
