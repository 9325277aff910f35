//! Integration tests for the Redis cache store
//!
//! These tests require a running Redis instance (7.4+ for per-field expiry).
//! Run with: REDIS_URL=redis://localhost:6379 cargo test -- --ignored

use ouroboros_query_cache::cache::{key_for, CacheStore};
use ouroboros_query_cache::{
    GroupExpiry, Model, Query, QueryCache, QueryResult, RedisConfig, RedisStore,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Order {
    id: u64,
    status: String,
}

impl Model for Order {
    const COLLECTION: &'static str = "orders";
}

// Each test gets its own prefix so parallel runs don't collide
fn get_redis_config(test: &str) -> RedisConfig {
    let url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let prefix = format!("query-cache-test:{}:{}:", test, std::process::id());
    RedisConfig::new(url).with_key_prefix(prefix)
}

async fn connect(test: &str) -> RedisStore {
    RedisStore::connect(get_redis_config(test))
        .await
        .expect("Failed to connect to Redis")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check_simple() {
    let store = connect("health").await;

    let result = store.health_check().await;

    assert!(result.is_ok(), "Health check should succeed");
    assert!(result.unwrap(), "Health check should return true");
}

#[tokio::test]
#[ignore]
async fn test_health_check_detailed() {
    let store = connect("health-detailed").await;

    let result = store.health_check_detailed().await;

    assert!(
        result.status.is_operational(),
        "Health check should be operational"
    );
    assert!(result.error.is_none());
    println!("Health check result: {:?}", result);
}

#[tokio::test]
#[ignore]
async fn test_flat_get_set_delete() {
    let store = connect("flat").await;

    store.set("k", "v1".to_string(), None).await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v1"));

    store.set("k", "v2".to_string(), Some(Duration::from_secs(30))).await.unwrap();
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));

    assert!(store.delete("k").await.unwrap());
    assert!(!store.delete("k").await.unwrap());
    assert!(store.get("k").await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_flat_ttl_expires() {
    let store = connect("flat-ttl").await;

    store.set("short", "v".to_string(), Some(Duration::from_secs(1))).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(store.get("short").await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn test_hash_set_get_and_delete_group() {
    let store = connect("hash").await;

    store.hash_set("orders", "a", "1".to_string(), Duration::from_secs(10)).await.unwrap();
    store.hash_set("orders", "b", "2".to_string(), Duration::from_secs(10)).await.unwrap();
    store.hash_set("users", "a", "3".to_string(), Duration::from_secs(10)).await.unwrap();

    assert_eq!(store.hash_get("orders", "a").await.unwrap().as_deref(), Some("1"));
    assert!(store.hash_get("orders", "missing").await.unwrap().is_none());

    assert!(store.hash_delete("orders", "b").await.unwrap());
    assert!(store.hash_get("orders", "b").await.unwrap().is_none());

    assert!(store.delete_group("orders").await.unwrap());
    assert!(!store.delete_group("orders").await.unwrap());
    assert!(store.hash_get("orders", "a").await.unwrap().is_none());
    assert_eq!(store.hash_get("users", "a").await.unwrap().as_deref(), Some("3"));

    store.delete_group("users").await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_hash_field_expiry() {
    let store = connect("hash-ttl").await;

    store.hash_set("g", "short", "1".to_string(), Duration::from_secs(1)).await.unwrap();
    store.hash_set("g", "long", "2".to_string(), Duration::from_secs(30)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(store.hash_get("g", "short").await.unwrap().is_none());
    assert_eq!(store.hash_get("g", "long").await.unwrap().as_deref(), Some("2"));

    store.delete_group("g").await.unwrap();
}

#[tokio::test]
#[ignore]
async fn test_group_expiry_mode() {
    let config = get_redis_config("group-mode").with_group_expiry(GroupExpiry::Group);
    let store = RedisStore::connect(config).await.expect("Failed to connect to Redis");

    store.hash_set("g", "a", "1".to_string(), Duration::from_secs(1)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1500)).await;

    assert!(store.hash_get("g", "a").await.unwrap().is_none());
    assert!(!store.delete_group("g").await.unwrap());
}

#[tokio::test]
#[ignore]
async fn test_query_cache_over_redis() {
    let cache = QueryCache::new(connect("query").await);
    let query = Query::for_model::<Order>()
        .filter("status", "open")
        .cache_in("orders");

    let first: Result<_, ()> = cache
        .execute(&query, || async {
            Ok(QueryResult::Many(vec![Order {
                id: 1,
                status: "open".to_string(),
            }]))
        })
        .await;
    assert_eq!(first.unwrap().len(), 1);

    let raw = cache
        .store()
        .hash_get("orders", key_for(&query).as_str())
        .await
        .unwrap();
    assert_eq!(raw.as_deref(), Some(r#"[{"id":1,"status":"open"}]"#));

    let second: Result<QueryResult<Order>, ()> = cache
        .execute(&query, || async { Ok(QueryResult::Many(Vec::new())) })
        .await;
    assert_eq!(second.unwrap().into_vec()[0].id, 1, "served from Redis");

    let event = cache.invalidate_group("orders").await.unwrap();
    assert!(event.removed);
}
