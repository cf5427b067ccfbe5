//! Alert rules engine for automatic alert triggering.
//!
//! Defines rules that monitor system state and trigger alerts when
//! thresholds are exceeded or conditions are met. Complements
//! [`crate::engine::alert_manager`], which raises alerts synchronously
//! from inside the pipeline; these rules poll metrics periodically for
//! conditions the pipeline itself doesn't observe directly.

use super::alerts::{Alert, AlertCategory, AlertManager, AlertSeverity};
use super::MetricsRegistry;
use crate::core::Position;
use anyhow::Result;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// Rule evaluation context.
pub struct RuleContext {
    pub position: Option<Arc<Position>>,
    pub metrics: Arc<MetricsRegistry>,
    pub timestamp: SystemTime,
}

pub trait AlertRule: Send + Sync {
    fn name(&self) -> &str;
    fn category(&self) -> AlertCategory;
    fn evaluate(&self, context: &RuleContext) -> Option<Alert>;
    fn is_enabled(&self) -> bool {
        true
    }
}

/// Position limit rule.
pub struct PositionLimitRule {
    pub max_position: i64,
    pub severity: AlertSeverity,
}

impl PositionLimitRule {
    pub fn new(max_position: i64, severity: AlertSeverity) -> Self {
        Self {
            max_position,
            severity,
        }
    }
}

impl AlertRule for PositionLimitRule {
    fn name(&self) -> &str {
        "position_limit_exceeded"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Risk
    }

    fn evaluate(&self, context: &RuleContext) -> Option<Alert> {
        let position = context.position.as_ref()?;
        let current_position = position.quantity();
        let abs_position = current_position.abs();

        if abs_position > self.max_position {
            let alert = Alert::new(
                self.category(),
                self.name(),
                self.severity,
                format!(
                    "position limit exceeded: {} > {}",
                    current_position, self.max_position
                ),
            )
            .with_detail("current_position", current_position.to_string())
            .with_detail("limit", self.max_position.to_string())
            .with_detail("excess", (abs_position - self.max_position).to_string());

            return Some(alert);
        }

        None
    }
}

/// Daily loss limit rule.
pub struct DailyLossLimitRule {
    pub max_daily_loss: i64,
    pub severity: AlertSeverity,
}

impl DailyLossLimitRule {
    pub fn new(max_daily_loss: i64, severity: AlertSeverity) -> Self {
        Self {
            max_daily_loss,
            severity,
        }
    }
}

impl AlertRule for DailyLossLimitRule {
    fn name(&self) -> &str {
        "daily_loss_limit_exceeded"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::Risk
    }

    fn evaluate(&self, context: &RuleContext) -> Option<Alert> {
        let position = context.position.as_ref()?;
        let daily_pnl = position.daily_pnl();

        if daily_pnl < 0 && daily_pnl.abs() > self.max_daily_loss {
            let alert = Alert::new(
                self.category(),
                self.name(),
                self.severity,
                format!(
                    "daily loss limit exceeded: {} < -{}",
                    daily_pnl, self.max_daily_loss
                ),
            )
            .with_detail("daily_pnl", daily_pnl.to_string())
            .with_detail("limit", self.max_daily_loss.to_string())
            .with_detail("excess_loss", (daily_pnl.abs() - self.max_daily_loss).to_string());

            return Some(alert);
        }

        None
    }
}

/// High ingress queue depth rule: fires when any shard's bounded
/// channel is backing up, ahead of the shard itself applying backpressure.
pub struct IngressQueueDepthRule {
    pub threshold: i64,
    pub shard: String,
    pub severity: AlertSeverity,
}

impl IngressQueueDepthRule {
    pub fn new(shard: impl Into<String>, threshold: i64, severity: AlertSeverity) -> Self {
        Self {
            threshold,
            shard: shard.into(),
            severity,
        }
    }
}

impl AlertRule for IngressQueueDepthRule {
    fn name(&self) -> &str {
        "high_ingress_queue_depth"
    }

    fn category(&self) -> AlertCategory {
        AlertCategory::System
    }

    fn evaluate(&self, context: &RuleContext) -> Option<Alert> {
        let depth = context
            .metrics
            .system()
            .ingress_queue_depth
            .with_label_values(&[&self.shard])
            .get();

        if depth > self.threshold {
            let alert = Alert::new(
                self.category(),
                self.name(),
                self.severity,
                format!("ingress queue depth {} exceeds {}", depth, self.threshold),
            )
            .with_detail("shard", self.shard.clone())
            .with_detail("depth", depth.to_string());

            return Some(alert);
        }

        None
    }
}

/// Rule engine that evaluates all rules periodically.
pub struct RuleEngine {
    rules: Vec<Box<dyn AlertRule>>,
    alert_manager: Arc<AlertManager>,
}

impl RuleEngine {
    pub fn new(alert_manager: Arc<AlertManager>) -> Self {
        Self {
            rules: Vec::new(),
            alert_manager,
        }
    }

    pub fn add_rule(&mut self, rule: Box<dyn AlertRule>) {
        debug!(rule = rule.name(), "adding alert rule");
        self.rules.push(rule);
    }

    pub fn with_default_rules(mut self) -> Self {
        self.add_rule(Box::new(PositionLimitRule::new(
            1_000_000_000,
            AlertSeverity::Critical,
        )));
        self.add_rule(Box::new(DailyLossLimitRule::new(
            1_000_000_000_000,
            AlertSeverity::Critical,
        )));
        self.add_rule(Box::new(IngressQueueDepthRule::new(
            "default",
            10_000,
            AlertSeverity::Warning,
        )));
        self
    }

    pub fn evaluate_all(&self, context: &RuleContext) -> Result<()> {
        for rule in &self.rules {
            if !rule.is_enabled() {
                continue;
            }

            if let Some(alert) = rule.evaluate(context) {
                debug!(alert = %alert.id, "alert triggered");
                self.alert_manager.send(alert)?;
            }
        }

        Ok(())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::alerts::AlertManagerConfig;
    use std::sync::atomic::Ordering;

    fn create_test_context() -> RuleContext {
        let position = Arc::new(Position::new());
        let metrics = Arc::new(MetricsRegistry::new().unwrap());

        RuleContext {
            position: Some(position),
            metrics,
            timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn position_limit_rule_triggers_above_threshold() {
        let rule = PositionLimitRule::new(1_000_000_000, AlertSeverity::Critical);
        let context = create_test_context();

        assert!(rule.evaluate(&context).is_none());

        context
            .position
            .as_ref()
            .unwrap()
            .quantity
            .store(1_500_000_000, Ordering::Relaxed);

        let alert = rule.evaluate(&context).unwrap();
        assert_eq!(alert.severity, AlertSeverity::Critical);
        assert_eq!(alert.id.name, "position_limit_exceeded");
        assert!(alert.details.contains_key("current_position"));
    }

    #[test]
    fn daily_loss_limit_rule_triggers_on_excess_loss() {
        let rule = DailyLossLimitRule::new(1_000_000_000_000, AlertSeverity::Critical);
        let context = create_test_context();

        assert!(rule.evaluate(&context).is_none());

        context
            .position
            .as_ref()
            .unwrap()
            .daily_pnl
            .store(-1_500_000_000_000, Ordering::Relaxed);

        let alert = rule.evaluate(&context).unwrap();
        assert_eq!(alert.id.name, "daily_loss_limit_exceeded");
    }

    #[test]
    fn ingress_queue_depth_rule_triggers_above_threshold() {
        let rule = IngressQueueDepthRule::new("shard-0", 100, AlertSeverity::Warning);
        let context = create_test_context();
        assert!(rule.evaluate(&context).is_none());

        context
            .metrics
            .system()
            .ingress_queue_depth
            .with_label_values(&["shard-0"])
            .set(250);

        let alert = rule.evaluate(&context).unwrap();
        assert_eq!(alert.id.name, "high_ingress_queue_depth");
    }

    #[test]
    fn rule_engine_with_default_rules_has_three_rules() {
        let alert_manager = Arc::new(AlertManager::new(AlertManagerConfig::default()));
        let engine = RuleEngine::new(alert_manager).with_default_rules();
        assert_eq!(engine.rule_count(), 3);
    }
}
