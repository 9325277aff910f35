//! Cache store abstraction and the in-process implementation

use crate::cache::{entry::CacheEntry, types::CacheValue};
use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Key-value store with flat keys and group hashes
///
/// Expiry is enforced by the store: a value whose TTL has elapsed must read
/// back as `None`. Implementations report an unreachable backend as an error
/// rather than as a miss, and must tolerate concurrent outstanding calls.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Read a flat key
    async fn get(&self, key: &str) -> Result<Option<CacheValue>>;

    /// Write a flat key; `ttl` of `None` never expires
    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> Result<()>;

    /// Delete a flat key, returning whether it existed
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Read a field of a group hash
    async fn hash_get(&self, group: &str, key: &str) -> Result<Option<CacheValue>>;

    /// Write a field of a group hash; the field expires `ttl` after this call
    async fn hash_set(
        &self,
        group: &str,
        key: &str,
        value: CacheValue,
        ttl: Duration,
    ) -> Result<()>;

    /// Delete a single field of a group hash, returning whether it existed
    async fn hash_delete(&self, group: &str, key: &str) -> Result<bool>;

    /// Delete a whole group, returning whether it existed
    ///
    /// Deleting a group that does not exist is not an error.
    async fn delete_group(&self, group: &str) -> Result<bool>;
}

#[async_trait]
impl<S: CacheStore + ?Sized> CacheStore for Arc<S> {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        (**self).get(key).await
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> Result<()> {
        (**self).set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        (**self).delete(key).await
    }

    async fn hash_get(&self, group: &str, key: &str) -> Result<Option<CacheValue>> {
        (**self).hash_get(group, key).await
    }

    async fn hash_set(
        &self,
        group: &str,
        key: &str,
        value: CacheValue,
        ttl: Duration,
    ) -> Result<()> {
        (**self).hash_set(group, key, value, ttl).await
    }

    async fn hash_delete(&self, group: &str, key: &str) -> Result<bool> {
        (**self).hash_delete(group, key).await
    }

    async fn delete_group(&self, group: &str) -> Result<bool> {
        (**self).delete_group(group).await
    }
}

/// In-process cache store with lazy TTL expiry
///
/// Suitable for tests, single-process deployments, and as a fallback when no
/// Redis is configured. Cloning shares the underlying storage.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Default)]
struct MemoryState {
    flat: HashMap<String, CacheEntry>,
    groups: HashMap<String, HashMap<String, CacheEntry>>,
    expired: u64,
}

impl MemoryState {
    fn prune_group(&mut self, group: &str) {
        if self.groups.get(group).is_some_and(|fields| fields.is_empty()) {
            self.groups.remove(group);
        }
    }
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live entries, flat and grouped
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        let flat = state.flat.values().filter(|e| !e.is_expired()).count();
        let grouped: usize = state
            .groups
            .values()
            .map(|fields| fields.values().filter(|e| !e.is_expired()).count())
            .sum();
        flat + grouped
    }

    /// Check if the store holds no live entries
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of live entries filed under `group`
    pub async fn group_len(&self, group: &str) -> usize {
        let state = self.state.read().await;
        state
            .groups
            .get(group)
            .map(|fields| fields.values().filter(|e| !e.is_expired()).count())
            .unwrap_or(0)
    }

    /// Approximate memory held by live entries, in bytes
    pub async fn size_bytes(&self) -> usize {
        let state = self.state.read().await;
        state
            .flat
            .values()
            .chain(state.groups.values().flat_map(HashMap::values))
            .filter(|e| !e.is_expired())
            .map(CacheEntry::size_bytes)
            .sum()
    }

    /// Remaining lifetime of a flat key; `None` when missing, expired or without TTL
    pub async fn ttl(&self, key: &str) -> Option<Duration> {
        let state = self.state.read().await;
        state.flat.get(key)?.time_until_expiration()
    }

    /// Remaining lifetime of a group field; `None` when missing or expired
    pub async fn hash_ttl(&self, group: &str, key: &str) -> Option<Duration> {
        let state = self.state.read().await;
        state.groups.get(group)?.get(key)?.time_until_expiration()
    }

    /// Number of entries dropped because their TTL elapsed
    pub async fn expired_count(&self) -> u64 {
        self.state.read().await.expired
    }

    /// Remove all expired entries, returning how many were dropped
    pub async fn cleanup_expired(&self) -> usize {
        let mut state = self.state.write().await;

        let before_flat = state.flat.len();
        state.flat.retain(|_, entry| !entry.is_expired());
        let mut removed = before_flat - state.flat.len();

        for fields in state.groups.values_mut() {
            let before = fields.len();
            fields.retain(|_, entry| !entry.is_expired());
            removed += before - fields.len();
        }
        state.groups.retain(|_, fields| !fields.is_empty());
        state.expired += removed as u64;

        if removed > 0 {
            debug!("Cleaned up {} expired entries", removed);
        }
        removed
    }

    /// Clear every entry
    pub async fn clear(&self) {
        let mut state = self.state.write().await;
        let count = state.flat.len() + state.groups.values().map(HashMap::len).sum::<usize>();
        state.flat.clear();
        state.groups.clear();
        info!("Cleared {} entries from memory store", count);
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut state = self.state.write().await;

        match state.flat.get(key) {
            Some(entry) if entry.is_expired() => {
                debug!("Memory entry expired: {}", key);
                state.flat.remove(key);
                state.expired += 1;
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> Result<()> {
        let mut state = self.state.write().await;
        state.flat.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .flat
            .remove(key)
            .is_some_and(|entry| !entry.is_expired()))
    }

    async fn hash_get(&self, group: &str, key: &str) -> Result<Option<CacheValue>> {
        let mut state = self.state.write().await;

        let expired = match state.groups.get(group).and_then(|fields| fields.get(key)) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Memory entry expired: {} / {}", group, key);
            if let Some(fields) = state.groups.get_mut(group) {
                fields.remove(key);
            }
            state.prune_group(group);
            state.expired += 1;
        }
        Ok(None)
    }

    async fn hash_set(
        &self,
        group: &str,
        key: &str,
        value: CacheValue,
        ttl: Duration,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(key.to_string(), CacheEntry::new(value, Some(ttl)));
        Ok(())
    }

    async fn hash_delete(&self, group: &str, key: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state
            .groups
            .get_mut(group)
            .and_then(|fields| fields.remove(key))
            .is_some_and(|entry| !entry.is_expired());
        state.prune_group(group);
        Ok(removed)
    }

    async fn delete_group(&self, group: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state
            .groups
            .remove(group)
            .is_some_and(|fields| fields.values().any(|entry| !entry.is_expired())))
    }
}

/// Background task that periodically sweeps expired entries from a [`MemoryStore`]
pub async fn start_auto_cleanup(store: MemoryStore, interval: Duration) {
    info!("Starting automatic cache cleanup task (interval: {:?})", interval);

    if interval.is_zero() {
        warn!("Cleanup interval is zero; automatic cleanup disabled");
        return;
    }

    loop {
        tokio::time::sleep(interval).await;
        store.cleanup_expired().await;
    }
}
