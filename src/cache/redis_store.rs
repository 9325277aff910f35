//! [`CacheStore`] over Redis strings and hashes

use crate::cache::{store::CacheStore, types::CacheValue};
use crate::connection::{GroupExpiry, RedisStore};
use crate::error::Result;
use async_trait::async_trait;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::debug;

/// Redis expiry has whole-second resolution and rejects zero
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<CacheValue>> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);
        self.timed("GET", conn.get(&key)).await
    }

    async fn set(&self, key: &str, value: CacheValue, ttl: Option<Duration>) -> Result<()> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);
        match ttl {
            Some(ttl) => {
                self.timed("SET EX", conn.set_ex(&key, value, ttl_secs(ttl)))
                    .await
            }
            None => self.timed("SET", conn.set(&key, value)).await,
        }
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let key = self.namespaced(key);
        let deleted: i64 = self.timed("DEL", conn.del(&key)).await?;
        Ok(deleted > 0)
    }

    async fn hash_get(&self, group: &str, key: &str) -> Result<Option<CacheValue>> {
        let mut conn = self.conn.clone();
        let group = self.namespaced(group);
        self.timed("HGET", conn.hget(&group, key)).await
    }

    async fn hash_set(
        &self,
        group: &str,
        key: &str,
        value: CacheValue,
        ttl: Duration,
    ) -> Result<()> {
        let mut conn = self.conn.clone();
        let group = self.namespaced(group);
        let secs = ttl_secs(ttl);

        let mut pipe = redis::pipe();
        pipe.atomic()
            .cmd("HSET")
            .arg(&group)
            .arg(key)
            .arg(value)
            .ignore();

        match self.config.group_expiry {
            GroupExpiry::Field => {
                pipe.cmd("HEXPIRE")
                    .arg(&group)
                    .arg(secs)
                    .arg("FIELDS")
                    .arg(1)
                    .arg(key)
                    .ignore();
            }
            GroupExpiry::Group => {
                pipe.cmd("EXPIRE").arg(&group).arg(secs).ignore();
            }
        }

        debug!("HSET {} with {}s expiry ({:?})", group, secs, self.config.group_expiry);
        self.timed("HSET", pipe.query_async(&mut conn)).await
    }

    async fn hash_delete(&self, group: &str, key: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let group = self.namespaced(group);
        let deleted: i64 = self.timed("HDEL", conn.hdel(&group, key)).await?;
        Ok(deleted > 0)
    }

    async fn delete_group(&self, group: &str) -> Result<bool> {
        let mut conn = self.conn.clone();
        let group = self.namespaced(group);
        let deleted: i64 = self.timed("DEL", conn.del(&group)).await?;
        Ok(deleted > 0)
    }
}
