use crate::resilience::cache::EvictionPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top-level runtime configuration for a pipeline instance.
///
/// Loaded from TOML via [`super::Config::load`] and overridable with
/// `MERIDIAN_*` environment variables (double underscore separates nested
/// fields, e.g. `MERIDIAN_BREAKER__FAILURE_THRESHOLD=10`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingEngineConfig,
    #[serde(default)]
    pub bulkhead: BulkheadSettings,
    #[serde(default)]
    pub breaker: BreakerSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub coordinator: CoordinatorSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            matching: MatchingEngineConfig::default(),
            bulkhead: BulkheadSettings::default(),
            breaker: BreakerSettings::default(),
            retry: RetrySettings::default(),
            cache: CacheSettings::default(),
            coordinator: CoordinatorSettings::default(),
            monitoring: MonitoringSettings::default(),
        }
    }
}

/// Matching engine sharding and queueing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingEngineConfig {
    /// Number of shard workers; each owns a disjoint partition of symbols.
    pub shards: usize,
    /// Bounded mpsc channel capacity per shard.
    pub ingress_queue_size: usize,
    /// Name registered in the plugin registry used when an order carries
    /// no explicit algorithm selection.
    pub default_algorithm: String,
}

impl Default for MatchingEngineConfig {
    fn default() -> Self {
        Self {
            shards: 4,
            ingress_queue_size: 4096,
            default_algorithm: "price-time-priority".to_string(),
        }
    }
}

/// Mirrors [`crate::resilience::bulkhead::BulkheadConfig`]; kept as a
/// separate serde-friendly type since the resilience type is `Copy` and
/// has no `Deserialize` impl of its own.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkheadSettings {
    pub max_concurrency: usize,
    pub max_waiting_queue: usize,
}

impl Default for BulkheadSettings {
    fn default() -> Self {
        Self {
            max_concurrency: 16,
            max_waiting_queue: 32,
        }
    }
}

impl From<BulkheadSettings> for crate::resilience::bulkhead::BulkheadConfig {
    fn from(s: BulkheadSettings) -> Self {
        Self {
            max_concurrency: s.max_concurrency,
            max_waiting_queue: s.max_waiting_queue,
        }
    }
}

/// Mirrors [`crate::resilience::circuit_breaker::CircuitBreakerConfig`].
/// `failure_window` and `success_threshold` are not externally
/// configurable; they keep the resilience module's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSettings {
    pub failure_threshold: u64,
    #[serde(with = "duration_millis")]
    pub timeout: Duration,
    pub half_open_max_probes: u64,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            timeout: Duration::from_secs(30),
            half_open_max_probes: 1,
        }
    }
}

impl From<BreakerSettings> for crate::resilience::circuit_breaker::CircuitBreakerConfig {
    fn from(s: BreakerSettings) -> Self {
        let defaults = Self::default();
        Self {
            failure_threshold: s.failure_threshold,
            timeout: s.timeout,
            half_open_max_probes: s.half_open_max_probes,
            ..defaults
        }
    }
}

/// Mirrors [`crate::resilience::backoff::BackoffConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    pub max_retries: Option<usize>,
    #[serde(with = "duration_millis")]
    pub initial_backoff: Duration,
    #[serde(with = "duration_millis")]
    pub max_backoff: Duration,
    pub factor: f64,
    pub jitter: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: Some(5),
            initial_backoff: Duration::from_millis(50),
            max_backoff: Duration::from_secs(5),
            factor: 2.0,
            jitter: 0.1,
        }
    }
}

impl From<RetrySettings> for crate::resilience::backoff::BackoffConfig {
    fn from(s: RetrySettings) -> Self {
        Self {
            initial_delay: s.initial_backoff,
            max_delay: s.max_backoff,
            multiplier: s.factor,
            max_retries: s.max_retries,
            jitter_factor: s.jitter,
        }
    }
}

/// Feeds [`crate::resilience::cache::BoundedCache::new`], which takes its
/// three fields positionally rather than a config struct of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSettings {
    #[serde(with = "duration_millis")]
    pub default_ttl: Duration,
    pub max_size: usize,
    pub policy: EvictionPolicy,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            max_size: 10_000,
            policy: EvictionPolicy::Lru,
        }
    }
}

/// Component coordinator memory budgeting and idle eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinatorSettings {
    /// Soft RSS ceiling, in bytes, beyond which new component construction
    /// is refused until an idle component is unloaded.
    pub memory_budget: u64,
    #[serde(with = "duration_millis")]
    pub idle_unload_after: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            memory_budget: 2 * 1024 * 1024 * 1024,
            idle_unload_after: Duration::from_secs(300),
        }
    }
}

/// Metrics server and alert sink settings; cold-path, unlike the above.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSettings {
    pub metrics_addr: String,
    pub log_level: String,
    pub console_alerts: bool,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            metrics_addr: "127.0.0.1:9090".to_string(),
            log_level: "info".to_string(),
            console_alerts: true,
        }
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        (d.as_millis() as u64).serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}
