//! Alerting for execution-pipeline anomalies: risk breaches, circuit
//! breaker trips, queue pressure, and engine failures.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AlertSeverity {
    Info = 1,
    Warning = 2,
    Error = 3,
    Critical = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertType {
    HighIngressQueueDepth,
    ShardWorkerLagging,
    OrderRejected,
    RiskLimitHit,
    RegulatoryCircuitBreakerTripped,
    ResilienceCircuitBreakerOpen,
    PluginAlgorithmPanicked,
    PluginAlgorithmRolledBack,
    PersistenceSinkStalled,
    MemoryPressure,
    ComponentConstructionFailed,
}

impl AlertType {
    pub fn default_severity(&self) -> AlertSeverity {
        match self {
            AlertType::HighIngressQueueDepth => AlertSeverity::Info,
            AlertType::ShardWorkerLagging | AlertType::OrderRejected => AlertSeverity::Warning,
            AlertType::RiskLimitHit
            | AlertType::PluginAlgorithmPanicked
            | AlertType::PersistenceSinkStalled => AlertSeverity::Error,
            AlertType::RegulatoryCircuitBreakerTripped
            | AlertType::ResilienceCircuitBreakerOpen
            | AlertType::PluginAlgorithmRolledBack
            | AlertType::MemoryPressure
            | AlertType::ComponentConstructionFailed => AlertSeverity::Critical,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            AlertType::HighIngressQueueDepth => "HIGH_INGRESS_QUEUE_DEPTH",
            AlertType::ShardWorkerLagging => "SHARD_WORKER_LAGGING",
            AlertType::OrderRejected => "ORDER_REJECTED",
            AlertType::RiskLimitHit => "RISK_LIMIT_HIT",
            AlertType::RegulatoryCircuitBreakerTripped => "REGULATORY_CIRCUIT_BREAKER",
            AlertType::ResilienceCircuitBreakerOpen => "RESILIENCE_CIRCUIT_BREAKER",
            AlertType::PluginAlgorithmPanicked => "PLUGIN_ALGORITHM_PANICKED",
            AlertType::PluginAlgorithmRolledBack => "PLUGIN_ALGORITHM_ROLLED_BACK",
            AlertType::PersistenceSinkStalled => "PERSISTENCE_SINK_STALLED",
            AlertType::MemoryPressure => "MEMORY_PRESSURE",
            AlertType::ComponentConstructionFailed => "COMPONENT_CONSTRUCTION_FAILED",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Alert {
    pub alert_type: AlertType,
    pub severity: AlertSeverity,
    pub message: String,
    pub context: HashMap<String, String>,
    pub timestamp: SystemTime,
    pub id: u64,
}

#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub severity_overrides: HashMap<AlertType, AlertSeverity>,
    pub rate_limit_per_minute: u32,
    pub rate_limit_by_severity: HashMap<AlertSeverity, u32>,
    pub halt_on_critical: bool,
}

impl Default for AlertConfig {
    fn default() -> Self {
        let mut rate_limit_by_severity = HashMap::new();
        rate_limit_by_severity.insert(AlertSeverity::Info, 20);
        rate_limit_by_severity.insert(AlertSeverity::Warning, 15);
        rate_limit_by_severity.insert(AlertSeverity::Error, 10);
        rate_limit_by_severity.insert(AlertSeverity::Critical, 100);

        Self {
            severity_overrides: HashMap::new(),
            rate_limit_per_minute: 10,
            rate_limit_by_severity,
            halt_on_critical: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertStats {
    pub total_alerts: u64,
    pub info_count: u64,
    pub warning_count: u64,
    pub error_count: u64,
    pub critical_count: u64,
    pub alerts_by_type: HashMap<AlertType, u64>,
    pub last_alert_time: Option<Instant>,
}

/// Centralized alert raising, rate limiting, and trading-halt escalation.
pub struct AlertManager {
    config: AlertConfig,
    next_alert_id: AtomicU64,
    alert_history: Vec<Alert>,
    alert_counts: HashMap<AlertType, Vec<Instant>>,
    stats: AlertStats,
    trading_halted: bool,
}

impl AlertManager {
    pub fn new(config: AlertConfig) -> Self {
        Self {
            config,
            next_alert_id: AtomicU64::new(1),
            alert_history: Vec::new(),
            alert_counts: HashMap::new(),
            stats: AlertStats::default(),
            trading_halted: false,
        }
    }

    pub fn raise_alert(
        &mut self,
        alert_type: AlertType,
        message: String,
        context: HashMap<String, String>,
    ) -> Result<()> {
        if !self.check_rate_limit(alert_type) {
            return Ok(());
        }

        let severity = self
            .config
            .severity_overrides
            .get(&alert_type)
            .copied()
            .unwrap_or_else(|| alert_type.default_severity());

        let alert = Alert {
            alert_type,
            severity,
            message: message.clone(),
            context,
            timestamp: SystemTime::now(),
            id: self.next_alert_id.fetch_add(1, Ordering::Relaxed),
        };

        self.log_alert(&alert);
        self.update_stats(&alert);
        self.alert_history.push(alert);

        if severity == AlertSeverity::Critical && self.config.halt_on_critical {
            self.trading_halted = true;
            error!(
                alert = alert_type.label(),
                "trading halted by critical alert: {}", message
            );
        }

        Ok(())
    }

    fn check_rate_limit(&mut self, alert_type: AlertType) -> bool {
        let now = Instant::now();
        let window_start = now - Duration::from_secs(60);

        let severity = self
            .config
            .severity_overrides
            .get(&alert_type)
            .copied()
            .unwrap_or_else(|| alert_type.default_severity());

        let rate_limit = self
            .config
            .rate_limit_by_severity
            .get(&severity)
            .copied()
            .unwrap_or(self.config.rate_limit_per_minute);

        let counts = self.alert_counts.entry(alert_type).or_default();
        counts.retain(|&time| time > window_start);

        if counts.len() >= rate_limit as usize {
            if severity == AlertSeverity::Critical {
                warn!(count = counts.len(), "critical alert rate high");
            } else {
                return false;
            }
        }

        counts.push(now);
        true
    }

    fn log_alert(&self, alert: &Alert) {
        let context_str = alert
            .context
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");

        match alert.severity {
            AlertSeverity::Info => info!(alert = alert.alert_type.label(), "{} | {}", alert.message, context_str),
            AlertSeverity::Warning => warn!(alert = alert.alert_type.label(), "{} | {}", alert.message, context_str),
            AlertSeverity::Error => error!(alert = alert.alert_type.label(), "{} | {}", alert.message, context_str),
            AlertSeverity::Critical => {
                error!(alert = alert.alert_type.label(), "CRITICAL: {} | {}", alert.message, context_str)
            }
        }
    }

    fn update_stats(&mut self, alert: &Alert) {
        self.stats.total_alerts += 1;
        self.stats.last_alert_time = Some(Instant::now());
        match alert.severity {
            AlertSeverity::Info => self.stats.info_count += 1,
            AlertSeverity::Warning => self.stats.warning_count += 1,
            AlertSeverity::Error => self.stats.error_count += 1,
            AlertSeverity::Critical => self.stats.critical_count += 1,
        }
        *self.stats.alerts_by_type.entry(alert.alert_type).or_insert(0) += 1;
    }

    pub fn is_trading_halted(&self) -> bool {
        self.trading_halted
    }

    pub fn reset_halt(&mut self) {
        self.trading_halted = false;
        info!("trading halt reset");
    }

    pub fn stats(&self) -> &AlertStats {
        &self.stats
    }

    pub fn recent_alerts(&self, count: usize) -> Vec<&Alert> {
        let start = self.alert_history.len().saturating_sub(count);
        self.alert_history[start..].iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_ordering_is_info_lowest_critical_highest() {
        assert!(AlertSeverity::Critical > AlertSeverity::Error);
        assert!(AlertSeverity::Error > AlertSeverity::Warning);
        assert!(AlertSeverity::Warning > AlertSeverity::Info);
    }

    #[test]
    fn raising_an_alert_updates_stats() {
        let mut manager = AlertManager::new(AlertConfig::default());
        manager
            .raise_alert(AlertType::RiskLimitHit, "limit breached".into(), HashMap::new())
            .unwrap();
        assert_eq!(manager.stats().total_alerts, 1);
        assert_eq!(manager.stats().error_count, 1);
    }

    #[test]
    fn critical_alert_halts_trading() {
        let mut manager = AlertManager::new(AlertConfig::default());
        manager
            .raise_alert(
                AlertType::RegulatoryCircuitBreakerTripped,
                "halted".into(),
                HashMap::new(),
            )
            .unwrap();
        assert!(manager.is_trading_halted());
    }

    #[test]
    fn rate_limiting_suppresses_excess_alerts_within_the_window() {
        let mut config = AlertConfig::default();
        config.rate_limit_by_severity.insert(AlertSeverity::Warning, 2);
        let mut manager = AlertManager::new(config);

        for i in 0..2 {
            manager
                .raise_alert(AlertType::ShardWorkerLagging, format!("lag {}", i), HashMap::new())
                .unwrap();
        }
        assert_eq!(manager.stats().total_alerts, 2);

        manager
            .raise_alert(AlertType::ShardWorkerLagging, "lag 3".into(), HashMap::new())
            .unwrap();
        assert_eq!(manager.stats().total_alerts, 2);
    }
}
