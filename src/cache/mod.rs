//! # Query Result Caching Layer
//!
//! This module implements transparent caching of read-query results in front
//! of a backing data store.
//!
//! ## Features
//!
//! - **Opt-in per query**: only queries built with [`Query::cache`] or
//!   [`Query::cache_in`] touch the cache
//! - **Deterministic keys**: derived from the filter and collection, independent
//!   of field insertion order
//! - **Hydration**: cached JSON is rebuilt into the caller's model type, as a
//!   single item or a list
//! - **TTL-Based Expiration**: grouped entries expire after a configurable TTL
//!   (10 seconds by default); flat entries persist unless configured otherwise
//! - **Group invalidation**: write paths clear every entry of a group at once
//! - **Fail-open**: an unreachable store or corrupt entry degrades to a normal
//!   query instead of an error
//!
//! ## Example
//!
//! ```rust
//! use ouroboros_query_cache::cache::{MemoryStore, QueryCache};
//! use ouroboros_query_cache::{Model, Query, QueryResult};
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
//! # async fn example() -> anyhow::Result<()> {
//! let cache = QueryCache::new(MemoryStore::new());
//! let query = Query::for_model::<Order>()
//!     .filter("status", "open")
//!     .cache_in("orders");
//!
//! let orders = cache
//!     .execute(&query, || async {
//!         // Run the real read here
//!         Ok::<_, anyhow::Error>(QueryResult::Many(vec![Order {
//!             id: 1,
//!             status: "open".to_string(),
//!         }]))
//!     })
//!     .await?;
//! assert_eq!(orders.len(), 1);
//!
//! // After a write to orders:
//! cache.invalidate_group("orders").await?;
//! # Ok(())
//! # }
//! ```
//!
//! [`Query::cache`]: crate::query::Query::cache
//! [`Query::cache_in`]: crate::query::Query::cache_in

pub mod codec;
pub mod config;
pub mod entry;
pub mod interceptor;
pub mod invalidation;
pub mod key;
pub mod redis_store;
pub mod store;
pub mod types;

pub use codec::{hydrate, serialize};
pub use config::{CacheConfig, CacheConfigBuilder, MIN_TTL};
pub use entry::CacheEntry;
pub use interceptor::{CachedClient, DataSource, QueryCache};
pub use invalidation::{InvalidationEvent, InvalidationReason};
pub use key::{derive_key, key_for};
pub use store::{start_auto_cleanup, CacheStore, MemoryStore};
pub use types::{CacheKey, CacheStats, CacheValue};
