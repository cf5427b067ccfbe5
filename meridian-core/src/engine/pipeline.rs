//! Per-order pipeline run by a shard worker: validate → rate-limit →
//! risk gate → match → trade emission → position update → status update
//! → outbound publish. Each stage can reject the order with a terminal
//! [`ExecutionError`]; only a successful risk-gate pass reaches the book.

use crate::core::errors::ExecutionError;
use crate::core::types::{Order, OrderStatus, Trade};
use crate::engine::alert_manager::{AlertManager, AlertType};
use crate::orderbook::OrderBook;
use crate::plugins::MatchingAlgorithm;
use crate::resilience::rate_limiter::RateLimiter;
use crate::risk::{RiskCheckOutcome, RiskGate};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{error, warn};

/// Every event the pipeline can emit downstream, matching the external
/// interface's egress event set.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    Trade(Trade),
    OrderStatus { order_id: crate::core::types::OrderId, status: OrderStatus },
    Rejected { order_id: crate::core::types::OrderId, reason: String },
}

/// What a single pipeline run produced, returned to the caller over the
/// shard's reply channel.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub trades: Vec<Trade>,
    pub order: Order,
}

pub struct Pipeline {
    algorithm: Arc<dyn MatchingAlgorithm>,
    rate_limiter: Arc<RateLimiter>,
    risk_gate: Arc<RiskGate>,
    alerts: Arc<Mutex<AlertManager>>,
    publisher: broadcast::Sender<PipelineEvent>,
    max_panics_before_alert: u32,
    panic_count: std::sync::atomic::AtomicU32,
}

impl Pipeline {
    pub fn new(
        algorithm: Arc<dyn MatchingAlgorithm>,
        rate_limiter: Arc<RateLimiter>,
        risk_gate: Arc<RiskGate>,
        alerts: Arc<Mutex<AlertManager>>,
        publisher: broadcast::Sender<PipelineEvent>,
    ) -> Self {
        Self {
            algorithm,
            rate_limiter,
            risk_gate,
            alerts,
            publisher,
            max_panics_before_alert: 3,
            panic_count: std::sync::atomic::AtomicU32::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.publisher.subscribe()
    }

    /// Run the full pipeline for `order` against its symbol's book. Never
    /// panics: a plugin algorithm panic is caught and turned into a
    /// rejection.
    pub fn run(&self, book: &mut OrderBook, mut order: Order) -> PipelineOutcome {
        if let Err(e) = validate(&order) {
            return self.reject(order, e);
        }

        if !self.rate_limiter.allow() {
            return self.reject(order, ExecutionError::RateLimited);
        }

        match self.risk_gate.check(&order) {
            Err(e) => {
                self.publish(PipelineEvent::Rejected {
                    order_id: order.id,
                    reason: e.message(),
                });
                let mut alerts = self.alerts.lock();
                let _ = alerts.raise_alert(
                    AlertType::RiskLimitHit,
                    e.message(),
                    Default::default(),
                );
                order.transition_to(OrderStatus::Rejected);
                return PipelineOutcome { trades: Vec::new(), order };
            }
            Ok(RiskCheckOutcome::Replay(ack)) => {
                return PipelineOutcome { trades: ack.trades, order: ack.order };
            }
            Ok(RiskCheckOutcome::Proceed) => {}
        }

        order.transition_to(OrderStatus::Pending);
        let taker_account = order.account_id.clone();
        let taker_side = order.side;
        let symbol = order.symbol.clone();
        let client_order_id = order.client_order_id.clone();

        let algorithm = self.algorithm.clone();
        let result = panic::catch_unwind(AssertUnwindSafe(|| algorithm.match_order(book, order)));

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(_) => {
                let count = self
                    .panic_count
                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
                    + 1;
                error!(algorithm = %self.algorithm.info().name, "matching algorithm panicked");
                let mut alerts = self.alerts.lock();
                let _ = alerts.raise_alert(
                    AlertType::PluginAlgorithmPanicked,
                    format!("algorithm '{}' panicked", self.algorithm.info().name),
                    Default::default(),
                );
                if count >= self.max_panics_before_alert {
                    let _ = alerts.raise_alert(
                        AlertType::PluginAlgorithmRolledBack,
                        format!(
                            "algorithm '{}' exceeded panic threshold, rollback recommended",
                            self.algorithm.info().name
                        ),
                        Default::default(),
                    );
                }
                warn!("order rejected after algorithm panic, book state is unaffected by the panicking call");
                let mut rejected = rebuild_rejected_order_placeholder();
                rejected.transition_to(OrderStatus::Rejected);
                return PipelineOutcome {
                    trades: Vec::new(),
                    order: rejected,
                };
            }
        };

        for trade in &outcome.trades {
            self.risk_gate
                .record_fill(&taker_account, &symbol, taker_side, trade.quantity);
            self.publish(PipelineEvent::Trade(trade.clone()));
        }
        self.publish(PipelineEvent::OrderStatus {
            order_id: outcome.order.id,
            status: outcome.order.status,
        });

        self.risk_gate.record_ack(
            &taker_account,
            &client_order_id,
            outcome.order.clone(),
            outcome.trades.clone(),
        );

        self.release_triggered_stops(book);

        PipelineOutcome {
            trades: outcome.trades,
            order: outcome.order,
        }
    }

    /// After a trade moves `book`'s last-trade-price, release any held
    /// stop/stop-limit orders whose trigger condition is now met and feed
    /// them back through the book as their underlying order type. A
    /// released order's own fills can move the last-trade-price again, so
    /// this repeats until a pass releases nothing.
    fn release_triggered_stops(&self, book: &mut OrderBook) {
        loop {
            let released = book.release_triggered_stops();
            if released.is_empty() {
                break;
            }
            for stop_order in released {
                let account = stop_order.account_id.clone();
                let side = stop_order.side;
                let symbol = stop_order.symbol.clone();
                let client_order_id = stop_order.client_order_id.clone();

                let stop_outcome = book.submit(stop_order);
                for trade in &stop_outcome.trades {
                    self.risk_gate.record_fill(&account, &symbol, side, trade.quantity);
                    self.publish(PipelineEvent::Trade(trade.clone()));
                }
                self.publish(PipelineEvent::OrderStatus {
                    order_id: stop_outcome.order.id,
                    status: stop_outcome.order.status,
                });
                self.risk_gate.record_ack(
                    &account,
                    &client_order_id,
                    stop_outcome.order,
                    stop_outcome.trades,
                );
            }
        }
    }

    fn reject(&self, mut order: Order, error: ExecutionError) -> PipelineOutcome {
        self.publish(PipelineEvent::Rejected {
            order_id: order.id,
            reason: error.message(),
        });
        order.transition_to(OrderStatus::Rejected);
        PipelineOutcome { trades: Vec::new(), order }
    }

    fn publish(&self, event: PipelineEvent) {
        // Best-effort: no subscribers is the common case outside tests.
        let _ = self.publisher.send(event);
    }
}

fn validate(order: &Order) -> Result<(), ExecutionError> {
    if order.quantity <= Decimal::ZERO {
        return Err(ExecutionError::Validation("quantity must be positive".to_string()));
    }
    if order.symbol.trim().is_empty() {
        return Err(ExecutionError::Validation("symbol must not be empty".to_string()));
    }
    if matches!(order.order_type, crate::core::types::OrderType::Limit | crate::core::types::OrderType::StopLimit)
        && order.price.is_none()
    {
        return Err(ExecutionError::Validation(
            "limit orders require a price".to_string(),
        ));
    }
    if matches!(order.order_type, crate::core::types::OrderType::Stop | crate::core::types::OrderType::StopLimit)
        && order.stop_price.is_none()
    {
        return Err(ExecutionError::Validation(
            "stop orders require a stop price".to_string(),
        ));
    }
    Ok(())
}

/// A panicking algorithm call leaves no well-formed order to return —
/// the in-flight order was moved into the panicking closure. The shard
/// worker only inspects `order.status` on this path, so an order shaped
/// just well enough to report `Rejected` is sufficient.
fn rebuild_rejected_order_placeholder() -> Order {
    use crate::core::types::{AccountId, OrderId, OrderType, Side, TimeInForce};
    Order::new(
        OrderId::generate(),
        "",
        "",
        AccountId::from(""),
        "",
        Side::Buy,
        OrderType::Limit,
        Decimal::ZERO,
        None,
        TimeInForce::Gtc,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{AccountId, OrderId, OrderType, Side, TimeInForce};
    use crate::risk::RiskLimits;
    use rust_decimal_macros::dec;

    struct AlwaysSubmit;
    impl MatchingAlgorithm for AlwaysSubmit {
        fn info(&self) -> &crate::plugins::PluginInfo {
            static INFO: std::sync::OnceLock<crate::plugins::PluginInfo> = std::sync::OnceLock::new();
            INFO.get_or_init(|| crate::plugins::PluginInfo {
                name: "test-algo".to_string(),
                version: semver::Version::new(1, 0, 0),
                min_core_version: semver::Version::new(0, 1, 0),
                max_core_version: semver::Version::new(0, 99, 0),
                dependencies: Vec::new(),
                performance_profile: crate::plugins::PerformanceProfile::Balanced,
            })
        }

        fn match_order(&self, book: &mut OrderBook, order: Order) -> crate::orderbook::MatchOutcome {
            book.submit(order)
        }
    }

    fn build_pipeline() -> Pipeline {
        let (tx, _rx) = broadcast::channel(16);
        Pipeline::new(
            Arc::new(AlwaysSubmit),
            Arc::new(RateLimiter::new(crate::resilience::RateLimiterConfig::aggressive())),
            Arc::new(RiskGate::new()),
            Arc::new(Mutex::new(AlertManager::new(Default::default()))),
            tx,
        )
    }

    fn sample_order(qty: Decimal, price: Option<Decimal>) -> Order {
        Order::new(
            OrderId::generate(),
            "c1",
            "u1",
            AccountId::from("acct-1"),
            "BTC-USD",
            Side::Buy,
            OrderType::Limit,
            qty,
            price,
            TimeInForce::Gtc,
        )
    }

    #[test]
    fn rejects_zero_quantity_before_touching_the_book() {
        let pipeline = build_pipeline();
        let mut book = OrderBook::new("BTC-USD");
        let outcome = pipeline.run(&mut book, sample_order(dec!(0), Some(dec!(100))));
        assert_eq!(outcome.order.status, OrderStatus::Rejected);
        assert!(outcome.trades.is_empty());
    }

    #[test]
    fn accepts_a_valid_order_within_risk_limits() {
        let pipeline = build_pipeline();
        pipeline.risk_gate.set_limits(RiskLimits::aggressive("acct-1"));
        let mut book = OrderBook::new("BTC-USD");
        let outcome = pipeline.run(&mut book, sample_order(dec!(1), Some(dec!(100))));
        assert_ne!(outcome.order.status, OrderStatus::Rejected);
    }

    #[test]
    fn rejects_order_exceeding_risk_limits() {
        let pipeline = build_pipeline();
        pipeline.risk_gate.set_limits(RiskLimits::conservative("acct-1"));
        let mut book = OrderBook::new("BTC-USD");
        let outcome = pipeline.run(&mut book, sample_order(dec!(10_000), Some(dec!(100))));
        assert_eq!(outcome.order.status, OrderStatus::Rejected);
    }

    #[test]
    fn rejects_a_stop_order_with_no_stop_price() {
        let pipeline = build_pipeline();
        pipeline.risk_gate.set_limits(RiskLimits::aggressive("acct-1"));
        let mut book = OrderBook::new("BTC-USD");
        let mut stop = sample_order(dec!(1), None);
        stop.order_type = OrderType::Stop;
        let outcome = pipeline.run(&mut book, stop);
        assert_eq!(outcome.order.status, OrderStatus::Rejected);
    }

    #[test]
    fn a_stop_order_is_released_and_matched_once_a_later_trade_crosses_its_trigger() {
        let pipeline = build_pipeline();
        pipeline.risk_gate.set_limits(RiskLimits::aggressive("acct-1"));
        pipeline.risk_gate.set_limits(RiskLimits::aggressive("acct-2"));
        pipeline.risk_gate.set_limits(RiskLimits::aggressive("acct-3"));
        let mut book = OrderBook::new("BTC-USD");

        let mut stop = sample_order(dec!(1), None);
        stop.order_type = OrderType::Stop;
        stop.stop_price = Some(dec!(105));
        let held = pipeline.run(&mut book, stop);
        assert_eq!(held.order.status, OrderStatus::Pending);
        assert!(held.trades.is_empty());
        assert_eq!(book.held_stop_count(), 1);

        let mut resting_ask = sample_order(dec!(1), Some(dec!(110)));
        resting_ask.account_id = AccountId::from("acct-2");
        resting_ask.client_order_id = "c2".to_string();
        resting_ask.side = Side::Sell;
        pipeline.run(&mut book, resting_ask);

        let mut crossing_bid = sample_order(dec!(1), Some(dec!(110)));
        crossing_bid.account_id = AccountId::from("acct-3");
        crossing_bid.client_order_id = "c3".to_string();
        let crossing_outcome = pipeline.run(&mut book, crossing_bid);
        assert_eq!(crossing_outcome.trades.len(), 1);

        // The held stop triggered and matched against the remaining book
        // state as part of this same run.
        assert_eq!(book.held_stop_count(), 0);
    }
}
