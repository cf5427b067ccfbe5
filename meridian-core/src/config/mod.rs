//! Runtime configuration.
//!
//! Settings load from a TOML file and merge with `MERIDIAN_*` environment
//! variable overrides (double underscore separates nested fields, e.g.
//! `MERIDIAN_BREAKER__FAILURE_THRESHOLD=10`). Every field has a default, so
//! a config file only needs to name what it overrides.
//!
//! Invalid combinations (e.g. a cache TTL of zero, or more bulkhead waiters
//! than the queue can ever drain) are rejected at startup by [`Config::validate`],
//! not discovered later as runtime errors.

pub mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use std::path::Path;

const ENV_PREFIX: &str = "MERIDIAN_";

impl Config {
    /// Load configuration from a TOML file, then apply `MERIDIAN_*`
    /// environment overrides, then validate.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut config: Config = toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `./config/default.toml`, falling back to built-in
    /// defaults (plus env overrides) if the file doesn't exist.
    pub fn load_default() -> Result<Self> {
        let default_path = Path::new("config/default.toml");
        let mut config = if default_path.exists() {
            let contents = std::fs::read_to_string(default_path)?;
            toml::from_str(&contents).context("failed to parse config/default.toml")?
        } else {
            Config::default()
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(v) = env_var("MATCHING__SHARDS") {
            self.matching.shards = v.parse().context("MERIDIAN_MATCHING__SHARDS")?;
        }
        if let Some(v) = env_var("MATCHING__INGRESS_QUEUE_SIZE") {
            self.matching.ingress_queue_size =
                v.parse().context("MERIDIAN_MATCHING__INGRESS_QUEUE_SIZE")?;
        }
        if let Some(v) = env_var("MATCHING__DEFAULT_ALGORITHM") {
            self.matching.default_algorithm = v;
        }
        if let Some(v) = env_var("BREAKER__FAILURE_THRESHOLD") {
            self.breaker.failure_threshold =
                v.parse().context("MERIDIAN_BREAKER__FAILURE_THRESHOLD")?;
        }
        if let Some(v) = env_var("BULKHEAD__MAX_CONCURRENCY") {
            self.bulkhead.max_concurrency =
                v.parse().context("MERIDIAN_BULKHEAD__MAX_CONCURRENCY")?;
        }
        if let Some(v) = env_var("MONITORING__METRICS_ADDR") {
            self.monitoring.metrics_addr = v;
        }
        if let Some(v) = env_var("MONITORING__LOG_LEVEL") {
            self.monitoring.log_level = v;
        }
        Ok(())
    }

    /// Reject invalid combinations before anything is constructed from them.
    pub fn validate(&self) -> Result<()> {
        if self.matching.shards == 0 {
            bail!("matching.shards must be at least 1");
        }
        if self.matching.ingress_queue_size == 0 {
            bail!("matching.ingressQueueSize must be at least 1");
        }
        if self.matching.default_algorithm.trim().is_empty() {
            bail!("matching.defaultAlgorithm must not be empty");
        }

        if self.bulkhead.max_concurrency == 0 {
            bail!("bulkhead.maxConcurrency must be at least 1");
        }

        if self.breaker.failure_threshold == 0 {
            bail!("breaker.failureThreshold must be at least 1");
        }
        if self.breaker.timeout.is_zero() {
            bail!("breaker.timeout must be positive");
        }
        if self.breaker.half_open_max_probes == 0 {
            bail!("breaker.halfOpenMaxProbes must be at least 1");
        }

        if let Some(0) = self.retry.max_retries {
            bail!("retry.maxRetries must be omitted (unlimited) or at least 1");
        }
        if self.retry.factor <= 1.0 {
            bail!("retry.factor must be greater than 1.0 to actually back off");
        }
        if self.retry.max_backoff < self.retry.initial_backoff {
            bail!("retry.maxBackoff must be >= retry.initialBackoff");
        }
        if !(0.0..=1.0).contains(&self.retry.jitter) {
            bail!("retry.jitter must be in [0.0, 1.0]");
        }

        if self.cache.max_size == 0 {
            bail!("cache.maxSize must be at least 1");
        }
        if self.cache.default_ttl.is_zero() {
            bail!("cache.defaultTTL must be positive");
        }

        if self.coordinator.memory_budget == 0 {
            bail!("coordinator.memoryBudget must be positive");
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!(
                "invalid log level '{}', must be one of {:?}",
                self.monitoring.log_level,
                valid_log_levels
            );
        }

        Ok(())
    }
}

fn env_var(suffix: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{suffix}")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_shards() {
        let mut config = Config::default();
        config.matching.shards = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_backoff_factor_not_greater_than_one() {
        let mut config = Config::default();
        config.retry.factor = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_max_backoff_below_initial() {
        let mut config = Config::default();
        config.retry.max_backoff = std::time::Duration::from_millis(1);
        config.retry.initial_backoff = std::time::Duration::from_secs(1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_empty_default_algorithm() {
        let mut config = Config::default();
        config.matching.default_algorithm = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_parses_toml_and_merges_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [matching]
            shards = 8
            ingressQueueSize = 8192
            defaultAlgorithm = "price-time-priority"
            "#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.matching.shards, 8);
        assert_eq!(config.matching.ingress_queue_size, 8192);
        // Untouched sections keep their defaults.
        assert_eq!(config.bulkhead.max_concurrency, 16);
    }

    #[test]
    fn load_rejects_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml {{{").unwrap();
        assert!(Config::load(&path).is_err());
    }
}
