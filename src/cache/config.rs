//! Configuration for the query cache

use crate::error::{CacheError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Shortest TTL any store is asked to hold an entry for
///
/// Redis expiry has one-second resolution; the in-process store follows the
/// same floor so both behave alike.
pub const MIN_TTL: Duration = Duration::from_secs(1);

/// Environment variable for the grouped-entry TTL in seconds
pub const GROUP_TTL_SECS_ENV: &str = "QUERY_CACHE_GROUP_TTL_SECS";

/// Environment variable for the flat-entry TTL in seconds (unset or 0: no expiry)
pub const FLAT_TTL_SECS_ENV: &str = "QUERY_CACHE_FLAT_TTL_SECS";

/// Environment variable for the TTL jitter factor
pub const TTL_JITTER_ENV: &str = "QUERY_CACHE_TTL_JITTER";

/// Configuration for the query interception layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Time-to-live for entries filed under a group
    pub group_ttl: Duration,

    /// Time-to-live for flat entries; `None` leaves them until evicted externally
    pub flat_ttl: Option<Duration>,

    /// TTL jitter factor (0.0 - 1.0)
    /// Spreads expiry of entries written together so they do not all miss at once
    pub ttl_jitter: f64,

    /// Enable hit/miss counters
    pub enable_metrics: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            group_ttl: Duration::from_secs(10),
            flat_ttl: None,
            ttl_jitter: 0.0,
            enable_metrics: true,
        }
    }
}

impl CacheConfig {
    /// Create a new builder for cache configuration
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// Load configuration from the environment (and a `.env` file if present)
    ///
    /// Unset variables keep their defaults; unparsable values are rejected.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let group_ttl = env_u64(GROUP_TTL_SECS_ENV)?
            .map(Duration::from_secs)
            .unwrap_or(defaults.group_ttl);
        let flat_ttl = match env_u64(FLAT_TTL_SECS_ENV)? {
            Some(0) | None => None,
            Some(secs) => Some(Duration::from_secs(secs)),
        };
        let ttl_jitter = match std::env::var(TTL_JITTER_ENV) {
            Ok(raw) => raw.parse::<f64>().map_err(|e| {
                CacheError::ConfigError(format!("{}={}: {}", TTL_JITTER_ENV, raw, e))
            })?,
            Err(_) => defaults.ttl_jitter,
        };

        let config = Self {
            group_ttl,
            flat_ttl,
            ttl_jitter,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.group_ttl < MIN_TTL {
            return Err(CacheError::ConfigError(
                "group_ttl must be at least 1 second".to_string(),
            ));
        }

        if matches!(self.flat_ttl, Some(ttl) if ttl < MIN_TTL) {
            return Err(CacheError::ConfigError(
                "flat_ttl must be at least 1 second when set".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            return Err(CacheError::ConfigError(
                "ttl_jitter must be between 0.0 and 1.0".to_string(),
            ));
        }

        Ok(())
    }

    /// Clamp out-of-range settings into range, logging each adjustment
    pub fn normalized(mut self) -> Self {
        if self.group_ttl < MIN_TTL {
            warn!("group_ttl {:?} is below {:?}; using {:?}", self.group_ttl, MIN_TTL, MIN_TTL);
            self.group_ttl = MIN_TTL;
        }

        if let Some(ttl) = self.flat_ttl.filter(|ttl| *ttl < MIN_TTL) {
            warn!("flat_ttl {:?} is below {:?}; using {:?}", ttl, MIN_TTL, MIN_TTL);
            self.flat_ttl = Some(MIN_TTL);
        }

        if !(0.0..=1.0).contains(&self.ttl_jitter) {
            let clamped = if self.ttl_jitter.is_nan() {
                0.0
            } else {
                self.ttl_jitter.clamp(0.0, 1.0)
            };
            warn!("ttl_jitter {} is out of range; using {}", self.ttl_jitter, clamped);
            self.ttl_jitter = clamped;
        }

        self
    }

    /// Apply the configured jitter to a base TTL, never going below [`MIN_TTL`]
    pub fn with_jitter(&self, base: Duration) -> Duration {
        let base = base.max(MIN_TTL);
        if self.ttl_jitter == 0.0 {
            return base;
        }

        let base_secs = base.as_secs_f64();
        let jitter_range = base_secs * self.ttl_jitter;
        let jitter = (rand::random::<f64>() * 2.0 - 1.0) * jitter_range;
        let final_secs = (base_secs + jitter).max(MIN_TTL.as_secs_f64());

        Duration::from_secs_f64(final_secs)
    }
}

fn env_u64(name: &str) -> Result<Option<u64>> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| CacheError::ConfigError(format!("{}={}: {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Builder for cache configuration
#[derive(Debug, Default)]
pub struct CacheConfigBuilder {
    group_ttl: Option<Duration>,
    flat_ttl: Option<Option<Duration>>,
    ttl_jitter: Option<f64>,
    enable_metrics: Option<bool>,
}

impl CacheConfigBuilder {
    /// Set TTL for grouped entries
    pub fn group_ttl(mut self, ttl: Duration) -> Self {
        self.group_ttl = Some(ttl);
        self
    }

    /// Set TTL for flat entries
    pub fn flat_ttl(mut self, ttl: Duration) -> Self {
        self.flat_ttl = Some(Some(ttl));
        self
    }

    /// Let flat entries live until evicted by the store
    pub fn no_flat_ttl(mut self) -> Self {
        self.flat_ttl = Some(None);
        self
    }

    /// Set TTL jitter factor (0.0 - 1.0)
    pub fn ttl_jitter(mut self, jitter: f64) -> Self {
        self.ttl_jitter = Some(jitter);
        self
    }

    /// Enable or disable metrics collection
    pub fn enable_metrics(mut self, enable: bool) -> Self {
        self.enable_metrics = Some(enable);
        self
    }

    /// Build the cache configuration
    pub fn build(self) -> CacheConfig {
        let defaults = CacheConfig::default();

        CacheConfig {
            group_ttl: self.group_ttl.unwrap_or(defaults.group_ttl),
            flat_ttl: self.flat_ttl.unwrap_or(defaults.flat_ttl),
            ttl_jitter: self.ttl_jitter.unwrap_or(defaults.ttl_jitter),
            enable_metrics: self.enable_metrics.unwrap_or(defaults.enable_metrics),
        }
    }
}
