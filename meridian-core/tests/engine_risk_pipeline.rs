//! Exercises the real pipeline: [`MatchingEngine`] wired to a
//! [`RiskGate`] and the `price-time-priority` plugin, end to end.

use meridian_core::core::types::{OrderId, OrderStatus, Side};
use meridian_core::engine::{AlertManager, MatchingEngine};
use meridian_core::resilience::{RateLimiter, RateLimiterConfig};
use meridian_core::risk::{RiskGate, RiskLimits};
use meridian_core::testing::limit_order;
use meridian_plugins::PriceTimeAlgorithm;
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn spawn_engine() -> (MatchingEngine, Arc<RiskGate>) {
    let risk_gate = Arc::new(RiskGate::new());
    let engine = MatchingEngine::spawn(
        2,
        64,
        Arc::new(PriceTimeAlgorithm::new()),
        Arc::new(RateLimiter::new(RateLimiterConfig::aggressive())),
        risk_gate.clone(),
        Arc::new(Mutex::new(AlertManager::new(Default::default()))),
    );
    (engine, risk_gate)
}

#[tokio::test]
async fn two_crossing_orders_produce_a_trade_through_the_engine() {
    let (engine, risk_gate) = spawn_engine();
    risk_gate.set_limits(RiskLimits::aggressive("acct-1"));
    risk_gate.set_limits(RiskLimits::aggressive("acct-2"));

    let bid = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
    let resting = engine.submit(bid).await.unwrap();
    assert!(resting.trades.is_empty());
    assert_eq!(resting.order.status, OrderStatus::Pending);

    let ask = limit_order("acct-2", "BTC-USD", Side::Sell, dec!(1), dec!(100));
    let filled = engine.submit(ask).await.unwrap();
    assert_eq!(filled.trades.len(), 1);

    engine.close();
}

#[tokio::test]
async fn an_order_exceeding_risk_limits_is_rejected_before_it_reaches_the_book() {
    let (engine, risk_gate) = spawn_engine();
    risk_gate.set_limits(RiskLimits::conservative("acct-1"));

    let oversized = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1000), dec!(100));
    let outcome = engine.submit(oversized).await.unwrap();

    assert_eq!(outcome.order.status, OrderStatus::Rejected);
    assert!(outcome.trades.is_empty());
    assert!(engine.cancel("BTC-USD", outcome.order.id).await.unwrap().is_none());

    engine.close();
}

#[tokio::test]
async fn cancel_removes_a_resting_order() {
    let (engine, risk_gate) = spawn_engine();
    risk_gate.set_limits(RiskLimits::aggressive("acct-1"));

    let bid = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
    let id = bid.id;
    engine.submit(bid).await.unwrap();

    let cancelled = engine.cancel("BTC-USD", id).await.unwrap();
    assert!(cancelled.is_some());

    engine.close();
}

#[tokio::test]
async fn cancel_of_unknown_order_id_returns_none() {
    let (engine, _risk_gate) = spawn_engine();
    let result = engine.cancel("BTC-USD", OrderId::generate()).await.unwrap();
    assert!(result.is_none());
    engine.close();
}

#[tokio::test]
async fn amend_updates_resting_quantity() {
    let (engine, risk_gate) = spawn_engine();
    risk_gate.set_limits(RiskLimits::aggressive("acct-1"));

    let bid = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
    let id = bid.id;
    engine.submit(bid).await.unwrap();

    let amended = engine.amend("BTC-USD", id, dec!(5), None).await.unwrap();
    assert_eq!(amended.order.quantity, dec!(5));

    engine.close();
}

#[tokio::test]
async fn duplicate_client_order_id_replays_the_first_ack() {
    let (engine, risk_gate) = spawn_engine();
    risk_gate.set_limits(RiskLimits::aggressive("acct-1"));

    let mut first = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
    first.client_order_id = "dup-1".to_string();
    let first_id = first.id;
    let first_outcome = engine.submit(first).await.unwrap();
    assert_eq!(first_outcome.order.status, OrderStatus::Pending);

    let mut second = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
    second.client_order_id = "dup-1".to_string();
    let replayed = engine.submit(second).await.unwrap();

    // Same order id and status as the original ack, not a fresh rejection
    // or a second resting order.
    assert_eq!(replayed.order.id, first_id);
    assert_eq!(replayed.order.status, first_outcome.order.status);
    assert_eq!(replayed.trades.len(), first_outcome.trades.len());

    engine.close();
}
