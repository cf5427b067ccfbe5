//! Pre-trade risk gate: the checks every inbound order passes through
//! before it reaches the matching engine.
//!
//! Checks run in a fixed order so the rejection reason reported to the
//! caller is always the first violated limit, not an arbitrary one:
//! 0. client order id already acknowledged — replay the prior ack, don't
//!    re-evaluate limits against it
//! 1. account active + symbol permitted
//! 2. order quantity within `max_order_size`
//! 3. hypothetical post-fill position within `max_position`
//! 4. projected daily loss within `max_daily_loss`
//! 5. regulatory circuit breaker not triggered for the symbol

use crate::core::errors::{ExecutionError, RiskRejectionReason};
use crate::core::types::{AccountId, Order, Position, Side, Symbol, Trade};
use crate::risk::circuit_breaker::RegulatoryCircuitBreaker;
use crate::risk::types::RiskLimits;
use dashmap::DashMap;
use rust_decimal::Decimal;

/// The order as it stood and the trades it produced the first time a
/// `(account, clientOrderId)` pair was processed. Cached so a retried
/// submission replays this unchanged instead of re-entering the book.
#[derive(Debug, Clone)]
pub struct OrderAck {
    pub order: Order,
    pub trades: Vec<Trade>,
}

/// Result of a pre-trade check: either the order may proceed, or it is a
/// resubmission of one already acknowledged, in which case the caller
/// should return `ack` unchanged without running the algorithm again.
#[derive(Debug)]
pub enum RiskCheckOutcome {
    Proceed,
    Replay(OrderAck),
}

/// Holds every account's limits, live positions, and the per-account ack
/// cache used for idempotent resubmission. One instance is shared across
/// all shards.
pub struct RiskGate {
    limits: DashMap<AccountId, RiskLimits>,
    positions: DashMap<(AccountId, Symbol), Position>,
    breakers: DashMap<Symbol, RegulatoryCircuitBreaker>,
    ack_cache: DashMap<(AccountId, String), OrderAck>,
}

impl RiskGate {
    pub fn new() -> Self {
        Self {
            limits: DashMap::new(),
            positions: DashMap::new(),
            breakers: DashMap::new(),
            ack_cache: DashMap::new(),
        }
    }

    pub fn set_limits(&self, limits: RiskLimits) {
        self.limits.insert(AccountId(limits.account_id.clone()), limits);
    }

    pub fn breaker_for(&self, symbol: &str) -> dashmap::mapref::one::RefMut<'_, Symbol, RegulatoryCircuitBreaker> {
        self.breakers
            .entry(symbol.to_string())
            .or_insert_with(|| RegulatoryCircuitBreaker::new(symbol))
    }

    fn position_quantity(&self, account: &AccountId, symbol: &str) -> i64 {
        self.positions
            .get(&(account.clone(), symbol.to_string()))
            .map(|p| p.quantity())
            .unwrap_or(0)
    }

    fn daily_pnl(&self, account: &AccountId, symbol: &str) -> i64 {
        self.positions
            .get(&(account.clone(), symbol.to_string()))
            .map(|p| p.daily_pnl())
            .unwrap_or(0)
    }

    /// Register a filled or partially filled order's position impact.
    /// Called by the engine after a trade is matched, not by `check`.
    pub fn record_fill(&self, account: &AccountId, symbol: &str, side: Side, qty: Decimal) {
        let position = self
            .positions
            .entry((account.clone(), symbol.to_string()))
            .or_insert_with(Position::new);
        let signed = match side {
            Side::Buy => qty,
            Side::Sell => -qty,
        };
        let _ = position.update_quantity(Position::decimal_to_fixed(signed));
    }

    /// Record the ack for a processed order so a resubmission under the
    /// same `(account, clientOrderId)` pair replays this outcome instead
    /// of being re-evaluated against current limits and re-matched.
    pub fn record_ack(&self, account: &AccountId, client_order_id: &str, order: Order, trades: Vec<Trade>) {
        self.ack_cache
            .entry((account.clone(), client_order_id.to_string()))
            .or_insert_with(|| OrderAck { order, trades });
    }

    /// Run the pre-trade checks against `order`. Returns the first
    /// violated limit as an [`ExecutionError::RiskRejection`], or a
    /// [`RiskCheckOutcome::Replay`] if this `(account, clientOrderId)`
    /// pair was already acknowledged.
    pub fn check(&self, order: &Order) -> Result<RiskCheckOutcome, ExecutionError> {
        let account = &order.account_id;

        let ack_key = (account.clone(), order.client_order_id.clone());
        if let Some(ack) = self.ack_cache.get(&ack_key) {
            return Ok(RiskCheckOutcome::Replay(ack.clone()));
        }

        let limits = self
            .limits
            .get(account)
            .map(|l| l.clone())
            .unwrap_or_else(|| RiskLimits::new(account.0.clone()));

        if !limits.active {
            return Err(RiskRejectionReason::AccountInactive.into());
        }
        if let Some(restricted_symbol) = &limits.symbol {
            if restricted_symbol != &order.symbol {
                return Err(RiskRejectionReason::SymbolNotPermitted.into());
            }
        }

        if order.quantity > limits.max_order_size {
            return Err(RiskRejectionReason::OrderSizeExceedsMax {
                size: order.quantity.to_string(),
                max: limits.max_order_size.to_string(),
            }
            .into());
        }

        let current_qty = Position::fixed_to_decimal(self.position_quantity(account, &order.symbol));
        let signed_qty = match order.side {
            Side::Buy => order.quantity,
            Side::Sell => -order.quantity,
        };
        let projected_qty = (current_qty + signed_qty).abs();
        if projected_qty > limits.max_position {
            return Err(RiskRejectionReason::PositionLimitExceeded {
                projected: projected_qty.to_string(),
                limit: limits.max_position.to_string(),
            }
            .into());
        }

        let current_daily_loss = Position::fixed_to_decimal(self.daily_pnl(account, &order.symbol)).min(Decimal::ZERO).abs();
        let worst_case_loss = order
            .price
            .unwrap_or(Decimal::ZERO)
            * order.quantity;
        let projected_loss = current_daily_loss + worst_case_loss;
        if projected_loss > limits.max_daily_loss {
            return Err(RiskRejectionReason::DailyLossLimitExceeded {
                projected: projected_loss.to_string(),
                limit: limits.max_daily_loss.to_string(),
            }
            .into());
        }

        if let Some(breaker) = self.breakers.get(&order.symbol) {
            if breaker.is_triggered() {
                return Err(RiskRejectionReason::CircuitBreakerTripped {
                    symbol: order.symbol.clone(),
                    reason: breaker
                        .reason()
                        .map(|r| r.to_string())
                        .unwrap_or_else(|| "unknown".to_string()),
                }
                .into());
            }
        }

        Ok(RiskCheckOutcome::Proceed)
    }
}

impl Default for RiskGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{OrderId, OrderStatus, OrderType, TimeInForce};
    use rust_decimal_macros::dec;

    fn sample_order(account: &str, client_order_id: &str, qty: Decimal, price: Decimal) -> Order {
        Order::new(
            OrderId::generate(),
            client_order_id,
            "user-1",
            AccountId::from(account),
            "BTC-USD",
            Side::Buy,
            OrderType::Limit,
            qty,
            Some(price),
            TimeInForce::Gtc,
        )
    }

    #[test]
    fn accepts_an_order_within_all_limits() {
        let gate = RiskGate::new();
        gate.set_limits(RiskLimits::aggressive("acct-1"));
        let order = sample_order("acct-1", "c1", dec!(1), dec!(100));
        assert!(gate.check(&order).is_ok());
    }

    #[test]
    fn rejects_inactive_account() {
        let gate = RiskGate::new();
        let mut limits = RiskLimits::new("acct-1");
        limits.active = false;
        gate.set_limits(limits);
        let order = sample_order("acct-1", "c1", dec!(1), dec!(100));
        assert!(matches!(
            gate.check(&order),
            Err(ExecutionError::RiskRejection(RiskRejectionReason::AccountInactive))
        ));
    }

    #[test]
    fn rejects_order_exceeding_max_order_size() {
        let gate = RiskGate::new();
        gate.set_limits(RiskLimits::conservative("acct-1"));
        let order = sample_order("acct-1", "c1", dec!(1000), dec!(100));
        assert!(matches!(
            gate.check(&order),
            Err(ExecutionError::RiskRejection(RiskRejectionReason::OrderSizeExceedsMax { .. }))
        ));
    }

    #[test]
    fn resubmitting_a_client_order_id_replays_the_first_ack() {
        let gate = RiskGate::new();
        gate.set_limits(RiskLimits::aggressive("acct-1"));
        let order = sample_order("acct-1", "c1", dec!(1), dec!(100));
        assert!(matches!(gate.check(&order), Ok(RiskCheckOutcome::Proceed)));

        let mut acked = order.clone();
        acked.transition_to(OrderStatus::Pending);
        acked.transition_to(OrderStatus::Filled);
        gate.record_ack(&AccountId::from("acct-1"), "c1", acked.clone(), Vec::new());

        // Now even an order that would otherwise fail a limit check
        // replays the cached ack unchanged rather than being rejected.
        gate.set_limits(RiskLimits::conservative("acct-1"));
        let retried = sample_order("acct-1", "c1", dec!(1), dec!(100));
        match gate.check(&retried) {
            Ok(RiskCheckOutcome::Replay(ack)) => {
                assert_eq!(ack.order.status, OrderStatus::Filled);
                assert!(ack.trades.is_empty());
            }
            other => panic!("expected a replayed ack, got {other:?}"),
        }
    }

    #[test]
    fn rejects_when_regulatory_breaker_triggered() {
        let gate = RiskGate::new();
        gate.set_limits(RiskLimits::aggressive("acct-1"));
        gate.breaker_for("BTC-USD")
            .trip(crate::risk::circuit_breaker::HaltReason::Manual);
        let order = sample_order("acct-1", "c1", dec!(1), dec!(100));
        assert!(matches!(
            gate.check(&order),
            Err(ExecutionError::RiskRejection(RiskRejectionReason::CircuitBreakerTripped { .. }))
        ));
    }

    #[test]
    fn rejects_position_limit_breach() {
        let gate = RiskGate::new();
        gate.set_limits(RiskLimits::conservative("acct-1"));
        let order = sample_order("acct-1", "c1", dec!(1), dec!(100));
        gate.record_fill(&AccountId::from("acct-1"), "BTC-USD", Side::Buy, dec!(9));
        assert!(matches!(
            gate.check(&order),
            Err(ExecutionError::RiskRejection(RiskRejectionReason::PositionLimitExceeded { .. }))
        ));
    }
}
