//! Regulatory circuit breaker: a per-symbol trading halt, distinct from
//! the software-reliability [`crate::resilience::CircuitBreaker`]. This
//! one is tripped by risk/compliance decisions (manual halt, a daily-loss
//! breach, an exchange-notified trading pause) rather than by call
//! failures, and the risk gate consults it on every order.

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    Manual,
    DailyLossLimitBreached,
    ExchangeNotified(String),
}

impl std::fmt::Display for HaltReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HaltReason::Manual => write!(f, "manual halt"),
            HaltReason::DailyLossLimitBreached => write!(f, "daily loss limit breached"),
            HaltReason::ExchangeNotified(detail) => write!(f, "exchange notified: {}", detail),
        }
    }
}

/// One per symbol. `triggered` gates order acceptance; `trigger_time`/
/// `reset_time` record the halt window for audit and for the engine's
/// reporting surface.
#[derive(Debug, Clone)]
pub struct RegulatoryCircuitBreaker {
    pub symbol: String,
    triggered: bool,
    reason: Option<HaltReason>,
    trigger_time: Option<u64>,
    reset_time: Option<u64>,
}

impl RegulatoryCircuitBreaker {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            triggered: false,
            reason: None,
            trigger_time: None,
            reset_time: None,
        }
    }

    pub fn trip(&mut self, reason: HaltReason) {
        self.triggered = true;
        self.reason = Some(reason);
        self.trigger_time = Some(now_millis());
        self.reset_time = None;
    }

    pub fn reset(&mut self) {
        self.triggered = false;
        self.reset_time = Some(now_millis());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn reason(&self) -> Option<&HaltReason> {
        self.reason.as_ref()
    }

    pub fn trigger_time(&self) -> Option<u64> {
        self.trigger_time
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
