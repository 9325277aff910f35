//! Query interception layer
//!
//! [`QueryCache`] sits in front of a read: when the query opted into caching
//! it checks the store, hydrates on a hit, and otherwise runs the real query
//! and writes the result back. [`CachedClient`] applies it to every read of a
//! wrapped [`DataSource`], so the caching behaviour belongs to that client
//! instance alone.
//!
//! Cache failures never reach the caller. An unreachable store or a corrupt
//! entry is logged and treated as a miss; only the data source's own error
//! is returned.

use crate::cache::{
    codec,
    config::CacheConfig,
    invalidation::InvalidationEvent,
    key::key_for,
    store::CacheStore,
    types::{CacheKey, CacheStats},
};
use crate::error::{CacheError, Result};
use crate::model::{Model, QueryResult};
use crate::query::{CacheMode, Query};
use async_trait::async_trait;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
    writes: AtomicU64,
    store_errors: AtomicU64,
    malformed_entries: AtomicU64,
    invalidations: AtomicU64,
}

/// Caching front for read queries
///
/// Cloning is cheap and shares the store handle and counters.
pub struct QueryCache<S> {
    store: Arc<S>,
    config: CacheConfig,
    counters: Arc<Counters>,
}

impl<S> Clone for QueryCache<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            counters: Arc::clone(&self.counters),
        }
    }
}

impl<S: CacheStore> QueryCache<S> {
    /// Create a query cache over `store` with the default configuration
    pub fn new(store: S) -> Self {
        Self::with_config(store, CacheConfig::default())
    }

    /// Create a query cache with custom configuration
    pub fn with_config(store: S, config: CacheConfig) -> Self {
        Self::from_shared(Arc::new(store), config)
    }

    /// Create a query cache over an already shared store handle
    ///
    /// Out-of-range settings are clamped (see [`CacheConfig::normalized`]).
    pub fn from_shared(store: Arc<S>, config: CacheConfig) -> Self {
        let config = config.normalized();
        debug!("Initializing query cache with config: {:?}", config);
        Self {
            store,
            config,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Get the underlying store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the active configuration
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Run `query`, serving it from the cache when possible
    ///
    /// `run` performs the real read. It is called only when the query is not
    /// cache-enabled or its entry is missing, expired, unreadable, or the
    /// store is down. Its error is returned unchanged and nothing is cached
    /// for a failed read. On a miss the original result is returned, not a
    /// re-hydrated copy.
    pub async fn execute<M, E, F, Fut>(
        &self,
        query: &Query,
        run: F,
    ) -> std::result::Result<QueryResult<M>, E>
    where
        M: Model,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<QueryResult<M>, E>>,
    {
        let Some(mode) = query.cache_mode() else {
            self.bump(&self.counters.bypassed);
            return run().await;
        };

        let key = key_for(query);

        let write_back = match self.lookup(&mode, &key).await {
            Ok(Some(raw)) => match codec::hydrate::<M>(&raw) {
                Ok(result) => {
                    self.bump(&self.counters.hits);
                    debug!("Cache hit: {} ({})", key, describe(&mode));
                    return Ok(result);
                }
                Err(e) => {
                    self.bump(&self.counters.malformed_entries);
                    warn!("Discarding unreadable cache entry {}: {}", key, e);
                    true
                }
            },
            Ok(None) => true,
            Err(e @ CacheError::MalformedEntry(_)) => {
                self.bump(&self.counters.malformed_entries);
                warn!("Store could not read cache entry {}: {}", key, e);
                true
            }
            Err(e) => {
                self.bump(&self.counters.store_errors);
                warn!("Cache store unavailable, querying data source directly: {}", e);
                false
            }
        };

        self.bump(&self.counters.misses);
        debug!("Cache miss: {} ({})", key, describe(&mode));

        let result = run().await?;

        if write_back {
            self.write_back(query, &mode, &key, &result).await;
        }

        Ok(result)
    }

    /// Delete every entry filed under `group`
    ///
    /// Clearing a group that holds nothing succeeds with `removed: false`.
    pub async fn invalidate_group(&self, group: &str) -> Result<InvalidationEvent> {
        let removed = self.store.delete_group(group).await?;
        self.bump(&self.counters.invalidations);
        info!("Invalidated cache group {} (existed: {})", group, removed);
        Ok(InvalidationEvent::group(group, removed))
    }

    /// Delete several groups, stopping at the first store failure
    pub async fn invalidate_groups<G: AsRef<str>>(
        &self,
        groups: &[G],
    ) -> Result<Vec<InvalidationEvent>> {
        let mut events = Vec::with_capacity(groups.len());
        for group in groups {
            events.push(self.invalidate_group(group.as_ref()).await?);
        }
        Ok(events)
    }

    /// Drop the single entry `query` would be served from
    ///
    /// Queries without a caching directive are looked up in flat mode.
    pub async fn forget(&self, query: &Query) -> Result<InvalidationEvent> {
        let key = key_for(query);
        match query.cache_mode().unwrap_or(CacheMode::Flat) {
            CacheMode::Flat => {
                let removed = self.store.delete(key.as_str()).await?;
                Ok(InvalidationEvent::entry(None, key.into_string(), removed))
            }
            CacheMode::Grouped(group) => {
                let removed = self.store.hash_delete(group, key.as_str()).await?;
                Ok(InvalidationEvent::entry(
                    Some(group.to_string()),
                    key.into_string(),
                    removed,
                ))
            }
        }
    }

    /// Snapshot of hit/miss counters
    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            hits: c.hits.load(Ordering::Relaxed),
            misses: c.misses.load(Ordering::Relaxed),
            bypassed: c.bypassed.load(Ordering::Relaxed),
            writes: c.writes.load(Ordering::Relaxed),
            store_errors: c.store_errors.load(Ordering::Relaxed),
            malformed_entries: c.malformed_entries.load(Ordering::Relaxed),
            invalidations: c.invalidations.load(Ordering::Relaxed),
        }
    }

    async fn lookup(&self, mode: &CacheMode<'_>, key: &CacheKey) -> Result<Option<String>> {
        match mode {
            CacheMode::Flat => self.store.get(key.as_str()).await,
            CacheMode::Grouped(group) => self.store.hash_get(group, key.as_str()).await,
        }
    }

    async fn write_back<M: Model>(
        &self,
        query: &Query,
        mode: &CacheMode<'_>,
        key: &CacheKey,
        result: &QueryResult<M>,
    ) {
        let value = match codec::serialize(result) {
            Ok(value) => value,
            Err(e) => {
                warn!("Not caching result for {}: {}", key, e);
                return;
            }
        };

        let ttl_override = query.directive().and_then(|d| d.ttl);
        let written = match mode {
            CacheMode::Flat => {
                let ttl = ttl_override
                    .or(self.config.flat_ttl)
                    .map(|ttl| self.config.with_jitter(ttl));
                self.store.set(key.as_str(), value, ttl).await
            }
            CacheMode::Grouped(group) => {
                let ttl = self.ttl_for_group(ttl_override);
                self.store.hash_set(group, key.as_str(), value, ttl).await
            }
        };

        match written {
            Ok(()) => {
                self.bump(&self.counters.writes);
                debug!("Cached result for {} ({})", key, describe(mode));
            }
            Err(e) => {
                self.bump(&self.counters.store_errors);
                warn!("Failed to cache result for {}: {}", key, e);
            }
        }
    }

    fn ttl_for_group(&self, ttl_override: Option<Duration>) -> Duration {
        self.config
            .with_jitter(ttl_override.unwrap_or(self.config.group_ttl))
    }

    fn bump(&self, counter: &AtomicU64) {
        if self.config.enable_metrics {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn describe(mode: &CacheMode<'_>) -> String {
    match mode {
        CacheMode::Flat => "flat".to_string(),
        CacheMode::Grouped(group) => format!("group {}", group),
    }
}

/// Backing data store reads, as seen by the cache
///
/// Implementations run the query for real; they never consult the cache.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Error produced by a failed read
    type Error: Send + 'static;

    /// Execute `query` against the backing store
    async fn find<M: Model>(
        &self,
        query: &Query,
    ) -> std::result::Result<QueryResult<M>, Self::Error>;
}

/// A data source whose reads go through a [`QueryCache`]
///
/// Writes are issued on [`source`](Self::source) directly and should be
/// followed by [`invalidate_group`](Self::invalidate_group) for the groups
/// they affect.
pub struct CachedClient<D, S> {
    source: D,
    cache: QueryCache<S>,
}

impl<D: DataSource, S: CacheStore> CachedClient<D, S> {
    /// Wrap `source` so its reads consult `cache`
    pub fn new(source: D, cache: QueryCache<S>) -> Self {
        Self { source, cache }
    }

    /// Read through the cache
    pub async fn find<M: Model>(
        &self,
        query: &Query,
    ) -> std::result::Result<QueryResult<M>, D::Error> {
        if query.collection() != M::COLLECTION {
            debug!(
                "Query on {} hydrates as {} model",
                query.collection(),
                M::COLLECTION
            );
        }
        self.cache
            .execute(query, || self.source.find::<M>(query))
            .await
    }

    /// Delete every entry filed under `group`
    pub async fn invalidate_group(&self, group: &str) -> Result<InvalidationEvent> {
        self.cache.invalidate_group(group).await
    }

    /// The wrapped data source, for writes and uncached access
    pub fn source(&self) -> &D {
        &self.source
    }

    /// The query cache in front of the data source
    pub fn cache(&self) -> &QueryCache<S> {
        &self.cache
    }
}
