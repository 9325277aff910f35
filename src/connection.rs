//! Redis connection management and health checks
//!
//! [`RedisStore`] owns a single multiplexed connection. Every operation
//! clones the handle, so concurrent queries pipeline over one socket without
//! waiting on each other. Its [`CacheStore`](crate::cache::CacheStore)
//! implementation lives in `cache::redis_store`.

use crate::error::{CacheError, Result};
use chrono::{DateTime, Utc};
use redis::aio::MultiplexedConnection;
use redis::{Client, ErrorKind, InfoDict, RedisError, RedisResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default Redis address
pub const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";

/// How grouped entries expire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupExpiry {
    /// Each hash field expires on its own (`HEXPIRE`, Redis 7.4+)
    Field,
    /// The whole group hash expires, refreshed on every write (`EXPIRE`)
    Group,
}

impl FromStr for GroupExpiry {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "field" => Ok(GroupExpiry::Field),
            "group" => Ok(GroupExpiry::Group),
            other => Err(CacheError::ConfigError(format!(
                "unknown group expiry mode '{}', expected 'field' or 'group'",
                other
            ))),
        }
    }
}

/// Redis connection configuration
#[derive(Debug, Clone)]
pub struct RedisConfig {
    /// Connection URL (e.g. "redis://localhost:6379")
    pub url: String,
    /// Prefix for flat keys and group names
    pub key_prefix: String,
    /// Timeout for establishing the connection
    pub connect_timeout: Duration,
    /// Timeout for each cache operation
    pub operation_timeout: Duration,
    /// Expiry mode for grouped entries
    ///
    /// `Field` needs Redis 7.4+; [`RedisStore::connect`] switches to `Group`
    /// when the server reports an older version.
    pub group_expiry: GroupExpiry,
    /// Response time threshold for degraded state (in milliseconds)
    pub degraded_threshold_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_REDIS_URL.to_string(),
            key_prefix: String::new(),
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_millis(500),
            group_expiry: GroupExpiry::Field,
            degraded_threshold_ms: 100,
        }
    }
}

impl RedisConfig {
    /// Create a configuration for `url` with default timeouts
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Environment variables:
    ///   REDIS_URL                  - connection URL (default: redis://127.0.0.1:6379)
    ///   REDIS_KEY_PREFIX           - prefix for keys and groups (default: none)
    ///   REDIS_CONNECT_TIMEOUT_SECS - connect timeout (default: 5)
    ///   REDIS_OPERATION_TIMEOUT_MS - per-operation timeout (default: 500)
    ///   REDIS_GROUP_EXPIRY         - "field" or "group" (default: field)
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        Ok(Self {
            url: std::env::var("REDIS_URL").unwrap_or(defaults.url),
            key_prefix: std::env::var("REDIS_KEY_PREFIX").unwrap_or(defaults.key_prefix),
            connect_timeout: env_number("REDIS_CONNECT_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.connect_timeout),
            operation_timeout: env_number("REDIS_OPERATION_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.operation_timeout),
            group_expiry: match std::env::var("REDIS_GROUP_EXPIRY") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.group_expiry,
            },
            degraded_threshold_ms: defaults.degraded_threshold_ms,
        })
    }

    /// Set the key prefix
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the per-operation timeout
    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the grouped-entry expiry mode
    pub fn with_group_expiry(mut self, mode: GroupExpiry) -> Self {
        self.group_expiry = mode;
        self
    }
}

fn env_number(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| CacheError::ConfigError(format!("{}={}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Health status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Redis is responsive
    Healthy,
    /// Redis is responsive but slow (above degraded threshold)
    Degraded,
    /// Redis is not responsive or erroring
    Unhealthy,
}

impl HealthStatus {
    /// Check if status is healthy or degraded (operational)
    pub fn is_operational(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

/// Detailed health check result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    /// Overall health status
    pub status: HealthStatus,
    /// Response time in milliseconds
    pub response_time_ms: u64,
    /// Timestamp of the health check
    pub timestamp: DateTime<Utc>,
    /// Error message (if unhealthy)
    pub error: Option<String>,
}

impl HealthCheckResult {
    fn responded(response_time: Duration, degraded_threshold_ms: u64) -> Self {
        let response_time_ms = response_time.as_millis() as u64;
        let status = if response_time_ms > degraded_threshold_ms {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Self {
            status,
            response_time_ms,
            timestamp: Utc::now(),
            error: None,
        }
    }

    fn unhealthy(response_time: Duration, error: &CacheError) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            response_time_ms: response_time.as_millis() as u64,
            timestamp: Utc::now(),
            error: Some(error.to_string()),
        }
    }
}

/// Redis-backed cache store
pub struct RedisStore {
    pub(crate) conn: MultiplexedConnection,
    pub(crate) config: RedisConfig,
}

impl RedisStore {
    /// Connect using `config`
    ///
    /// With [`GroupExpiry::Field`] the server version is checked once; servers
    /// older than 7.4 lack `HEXPIRE`, so the store falls back to
    /// [`GroupExpiry::Group`].
    ///
    /// # Example
    /// ```no_run
    /// use ouroboros_query_cache::{RedisConfig, RedisStore};
    ///
    /// #[tokio::main]
    /// async fn main() -> anyhow::Result<()> {
    ///     let store = RedisStore::connect(RedisConfig::new("redis://localhost:6379")).await?;
    ///     assert!(store.health_check().await?);
    ///     Ok(())
    /// }
    /// ```
    pub async fn connect(config: RedisConfig) -> Result<Self> {
        info!("Connecting to Redis at {}", config.url);

        let client = Client::open(config.url.as_str())?;

        let conn = match tokio::time::timeout(
            config.connect_timeout,
            client.get_multiplexed_async_connection(),
        )
        .await
        {
            Ok(Ok(conn)) => conn,
            Ok(Err(e)) => return Err(CacheError::ConnectionError(e.to_string())),
            Err(_) => {
                return Err(CacheError::TimeoutError {
                    timeout_ms: config.connect_timeout.as_millis() as u64,
                    context: format!("connecting to {}", config.url),
                })
            }
        };

        info!("Successfully connected to Redis");
        let mut store = Self { conn, config };
        if store.config.group_expiry == GroupExpiry::Field {
            store.check_field_expiry().await;
        }
        Ok(store)
    }

    async fn check_field_expiry(&mut self) {
        let mut conn = self.conn.clone();
        let info: Result<InfoDict> = self
            .timed("INFO", redis::cmd("INFO").arg("server").query_async(&mut conn))
            .await;

        match info.map(|info| info.get::<String>("redis_version")) {
            Ok(Some(version)) if !supports_field_expiry(&version) => {
                warn!(
                    "Redis {} has no HEXPIRE (7.4+); grouped entries expire per group",
                    version
                );
                self.config.group_expiry = GroupExpiry::Group;
            }
            Ok(Some(version)) => debug!("Redis {} supports per-field expiry", version),
            Ok(None) => warn!("Redis did not report its version; keeping per-field expiry"),
            Err(e) => warn!("Could not read Redis version ({}); keeping per-field expiry", e),
        }
    }

    /// Connect using configuration from the environment
    pub async fn from_env() -> Result<Self> {
        Self::connect(RedisConfig::from_env()?).await
    }

    /// Get the active configuration
    pub fn config(&self) -> &RedisConfig {
        &self.config
    }

    /// Simple health check using PING
    pub async fn health_check(&self) -> Result<bool> {
        debug!("Executing Redis health check (PING)");
        let mut conn = self.conn.clone();
        let reply: String = self
            .timed("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;
        Ok(reply == "PONG")
    }

    /// Health check with timing; never returns an error
    pub async fn health_check_detailed(&self) -> HealthCheckResult {
        let start = Instant::now();
        match self.health_check().await {
            Ok(true) => {
                HealthCheckResult::responded(start.elapsed(), self.config.degraded_threshold_ms)
            }
            Ok(false) => {
                let error = CacheError::StoreUnavailable("unexpected PING reply".to_string());
                warn!("Redis health check failed: {}", error);
                HealthCheckResult::unhealthy(start.elapsed(), &error)
            }
            Err(e) => {
                warn!("Redis health check failed: {}", e);
                HealthCheckResult::unhealthy(start.elapsed(), &e)
            }
        }
    }

    /// Apply the configured prefix to a key or group name
    pub(crate) fn namespaced(&self, name: &str) -> String {
        format!("{}{}", self.config.key_prefix, name)
    }

    /// Run a Redis call under the operation timeout
    pub(crate) async fn timed<T, F>(&self, context: &str, call: F) -> Result<T>
    where
        F: Future<Output = RedisResult<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(classify(context, e)),
            Err(_) => Err(CacheError::TimeoutError {
                timeout_ms: self.config.operation_timeout.as_millis() as u64,
                context: context.to_string(),
            }),
        }
    }
}

/// Map a driver error onto the cache error it stands for
///
/// A reply that cannot be read as the stored value (`WRONGTYPE`, bytes that
/// are not UTF-8) means the entry is bad while the server is fine.
fn classify(context: &str, e: RedisError) -> CacheError {
    if is_entry_error(e.kind(), e.code()) {
        CacheError::MalformedEntry(format!("{}: {}", context, e))
    } else {
        CacheError::StoreUnavailable(format!("{}: {}", context, e))
    }
}

fn is_entry_error(kind: ErrorKind, code: Option<&str>) -> bool {
    kind == ErrorKind::TypeError || code == Some("WRONGTYPE")
}

/// `HEXPIRE` arrived in Redis 7.4
fn supports_field_expiry(version: &str) -> bool {
    let mut parts = version
        .trim()
        .split('.')
        .map(|part| part.parse::<u32>().unwrap_or(0));
    let major = parts.next().unwrap_or(0);
    let minor = parts.next().unwrap_or(0);
    (major, minor) >= (7, 4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RedisConfig::default();
        assert_eq!(config.url, DEFAULT_REDIS_URL);
        assert_eq!(config.group_expiry, GroupExpiry::Field);
        assert!(config.key_prefix.is_empty());
    }

    #[test]
    fn test_config_builders() {
        let config = RedisConfig::new("redis://cache:6379")
            .with_key_prefix("app:")
            .with_operation_timeout(Duration::from_millis(50))
            .with_group_expiry(GroupExpiry::Group);

        assert_eq!(config.url, "redis://cache:6379");
        assert_eq!(config.key_prefix, "app:");
        assert_eq!(config.operation_timeout, Duration::from_millis(50));
        assert_eq!(config.group_expiry, GroupExpiry::Group);
    }

    #[test]
    fn test_group_expiry_parse() {
        assert_eq!("field".parse::<GroupExpiry>().unwrap(), GroupExpiry::Field);
        assert_eq!(" GROUP ".parse::<GroupExpiry>().unwrap(), GroupExpiry::Group);
        assert!("hash".parse::<GroupExpiry>().is_err());
    }

    #[test]
    fn test_health_status() {
        assert!(HealthStatus::Healthy.is_operational());
        assert!(HealthStatus::Degraded.is_operational());
        assert!(!HealthStatus::Unhealthy.is_operational());

        let slow = HealthCheckResult::responded(Duration::from_millis(250), 100);
        assert_eq!(slow.status, HealthStatus::Degraded);
        let fast = HealthCheckResult::responded(Duration::from_millis(5), 100);
        assert_eq!(fast.status, HealthStatus::Healthy);
    }

    #[test]
    fn test_unreadable_values_are_entry_errors() {
        let utf8 = RedisError::from((ErrorKind::TypeError, "invalid utf-8 sequence"));
        let err = classify("GET", utf8);
        assert!(matches!(err, CacheError::MalformedEntry(_)));
        assert!(!err.is_unavailable());

        assert!(is_entry_error(ErrorKind::ExtensionError, Some("WRONGTYPE")));
        assert!(!is_entry_error(ErrorKind::ResponseError, Some("ERR")));
    }

    #[test]
    fn test_transport_failures_are_unavailable() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        let err = classify("HGET", RedisError::from(reset));
        assert!(matches!(err, CacheError::StoreUnavailable(_)));

        let loading = RedisError::from((ErrorKind::BusyLoadingError, "loading dataset"));
        assert!(classify("GET", loading).is_unavailable());
    }

    #[test]
    fn test_field_expiry_version_check() {
        assert!(supports_field_expiry("7.4.0"));
        assert!(supports_field_expiry("8.0.1"));
        assert!(!supports_field_expiry("7.2.4"));
        assert!(!supports_field_expiry("6.2.14"));
        assert!(!supports_field_expiry("garbage"));
    }

    #[tokio::test]
    async fn test_connect_to_closed_port_fails() {
        let mut config = RedisConfig::new("redis://127.0.0.1:1");
        config.connect_timeout = Duration::from_secs(2);

        let err = RedisStore::connect(config).await.err().unwrap();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn test_invalid_url_rejected() {
        let result = RedisStore::connect(RedisConfig::new("not a url")).await;
        assert!(matches!(result, Err(CacheError::DriverError(_))));
    }
}
