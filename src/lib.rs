//! # Ouroboros Query Cache (ouroboros-query-cache)
//!
//! A transparent read-through cache for data-access queries, backed by Redis.
//!
//! ## Features
//!
//! - Per-query opt-in caching with optional invalidation groups
//! - Deterministic cache keys from query shape
//! - JSON serialization with hydration back into typed models
//! - TTL-based expiry, per group field or per group
//! - Group invalidation for write paths
//! - Fail-open behaviour: cache outages never fail a query
//! - Redis health checks
//!
//! ## Wrapping a data source
//!
//! ```no_run
//! use async_trait::async_trait;
//! use ouroboros_query_cache::{
//!     CachedClient, DataSource, Model, Query, QueryCache, QueryResult, RedisConfig, RedisStore,
//! };
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! struct Order {
//!     id: u64,
//!     status: String,
//! }
//!
//! impl Model for Order {
//!     const COLLECTION: &'static str = "orders";
//! }
//!
//! struct Database;
//!
//! #[async_trait]
//! impl DataSource for Database {
//!     type Error = std::io::Error;
//!
//!     async fn find<M: Model>(&self, _query: &Query) -> Result<QueryResult<M>, Self::Error> {
//!         Ok(QueryResult::Many(Vec::new()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = RedisStore::connect(RedisConfig::from_env()?).await?;
//!     let client = CachedClient::new(Database, QueryCache::new(store));
//!
//!     let query = Query::for_model::<Order>()
//!         .filter("status", "open")
//!         .cache_in("orders");
//!
//!     // First call reads the database, the second is served from Redis
//!     let first = client.find::<Order>(&query).await?;
//!     let second = client.find::<Order>(&query).await?;
//!     assert_eq!(first.len(), second.len());
//!
//!     // After writing orders
//!     client.invalidate_group("orders").await?;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod connection;
pub mod error;
pub mod model;
pub mod query;

// Re-export main types for convenience
pub use cache::{
    CacheConfig, CacheConfigBuilder, CacheKey, CacheStats, CacheStore, CachedClient, DataSource,
    InvalidationEvent, InvalidationReason, MemoryStore, QueryCache,
};
pub use connection::{GroupExpiry, HealthCheckResult, HealthStatus, RedisConfig, RedisStore};
pub use error::{CacheError, Result};
pub use model::{Model, QueryResult};
pub use query::{CacheDirective, CacheMode, Filter, Query};
