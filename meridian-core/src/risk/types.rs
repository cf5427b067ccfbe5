//! Risk limit configuration and the data an order must satisfy to pass
//! pre-trade review.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Per-account (optionally per-symbol) risk limits. `symbol: None` means
/// the limit applies across every symbol the account trades.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLimits {
    pub account_id: String,
    pub symbol: Option<String>,
    pub max_position: Decimal,
    pub max_order_size: Decimal,
    pub max_daily_loss: Decimal,
    pub active: bool,
}

impl RiskLimits {
    pub fn new(account_id: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            symbol: None,
            max_position: Decimal::new(100, 0),
            max_order_size: Decimal::new(10, 0),
            max_daily_loss: Decimal::new(10_000, 0),
            active: true,
        }
    }

    pub fn conservative(account_id: impl Into<String>) -> Self {
        Self {
            max_position: Decimal::new(10, 0),
            max_order_size: Decimal::new(1, 0),
            max_daily_loss: Decimal::new(1_000, 0),
            ..Self::new(account_id)
        }
    }

    pub fn aggressive(account_id: impl Into<String>) -> Self {
        Self {
            max_position: Decimal::new(10_000, 0),
            max_order_size: Decimal::new(1_000, 0),
            max_daily_loss: Decimal::new(1_000_000, 0),
            ..Self::new(account_id)
        }
    }
}
