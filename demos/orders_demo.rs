//! Orders Query Cache Demo
//!
//! Runs a few reads against an in-memory orders table through the query
//! cache, then writes an order and invalidates the group.
//!
//! Usage:
//!   cargo run --example orders_demo
//!   REDIS_URL=redis://localhost:6379 cargo run --example orders_demo
//!
//! Without REDIS_URL the in-process store is used. Set RUST_LOG=debug to see
//! every hit and miss.

use async_trait::async_trait;
use ouroboros_query_cache::{
    CacheConfig, CacheStore, CachedClient, DataSource, MemoryStore, Model, Query, QueryCache,
    QueryResult, RedisStore,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Order {
    id: u64,
    customer: u64,
    status: String,
}

impl Model for Order {
    const COLLECTION: &'static str = "orders";
}

/// Orders table with an artificial read latency
struct OrdersTable {
    rows: Mutex<Vec<Value>>,
    latency: Duration,
}

impl OrdersTable {
    fn seeded() -> Self {
        let rows = (1..=50)
            .map(|id| {
                json!({
                    "id": id,
                    "customer": id % 5,
                    "status": if id % 3 == 0 { "closed" } else { "open" },
                })
            })
            .collect();

        Self {
            rows: Mutex::new(rows),
            latency: Duration::from_millis(25),
        }
    }

    fn insert(&self, order: &Order) -> anyhow::Result<()> {
        let row = serde_json::to_value(order)?;
        self.rows
            .lock()
            .map_err(|_| anyhow::anyhow!("orders table lock poisoned"))?
            .push(row);
        Ok(())
    }
}

#[async_trait]
impl DataSource for OrdersTable {
    type Error = anyhow::Error;

    async fn find<M: Model>(&self, query: &Query) -> anyhow::Result<QueryResult<M>> {
        tokio::time::sleep(self.latency).await;

        let matching: Vec<Value> = self
            .rows
            .lock()
            .map_err(|_| anyhow::anyhow!("orders table lock poisoned"))?
            .iter()
            .filter(|row| query.predicate().matches(row))
            .cloned()
            .collect();

        let models = matching
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<M>, _>>()?;
        Ok(QueryResult::Many(models))
    }
}

async fn timed_find<S: CacheStore>(
    client: &CachedClient<OrdersTable, S>,
    label: &str,
    query: &Query,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let orders = client.find::<Order>(query).await?;
    info!(
        "{:<28} {:>3} orders in {:>6.2}ms",
        label,
        orders.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );
    Ok(())
}

async fn run<S: CacheStore>(store: S) -> anyhow::Result<()> {
    let config = CacheConfig::from_env()?;
    info!("Cache config: {:?}", config);

    let client = CachedClient::new(OrdersTable::seeded(), QueryCache::with_config(store, config));

    let open = Query::for_model::<Order>()
        .filter("status", "open")
        .cache_in("orders");
    let customer = Query::for_model::<Order>().filter("customer", 2).cache();
    let uncached = Query::for_model::<Order>().filter("status", "closed");

    info!("\n--- Grouped query ---");
    timed_find(&client, "open orders (miss)", &open).await?;
    timed_find(&client, "open orders (hit)", &open).await?;

    info!("\n--- Flat query ---");
    timed_find(&client, "customer 2 (miss)", &customer).await?;
    timed_find(&client, "customer 2 (hit)", &customer).await?;

    info!("\n--- Uncached query ---");
    timed_find(&client, "closed orders", &uncached).await?;
    timed_find(&client, "closed orders", &uncached).await?;

    info!("\n--- Write and invalidate ---");
    client.source().insert(&Order {
        id: 51,
        customer: 1,
        status: "open".to_string(),
    })?;
    timed_find(&client, "open orders (stale hit)", &open).await?;

    let event = client.invalidate_group("orders").await?;
    info!("Invalidated group {:?} (existed: {})", event.group, event.removed);
    timed_find(&client, "open orders (refreshed)", &open).await?;

    info!("\n--- Stats ---");
    info!("{}", client.cache().stats());

    client.cache().forget(&customer).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("=== Orders Query Cache Demo ===");

    match std::env::var("REDIS_URL") {
        Ok(url) => {
            info!("Using Redis at {}", url);
            let store = RedisStore::from_env().await?;
            let health = store.health_check_detailed().await;
            info!("Redis health: {:?} ({}ms)", health.status, health.response_time_ms);
            run(store).await
        }
        Err(_) => {
            info!("REDIS_URL not set, using the in-process store");
            run(MemoryStore::new()).await
        }
    }
}
