//! Second reference algorithm, used to exercise the registry's hot-swap
//! path: identical price-time matching, but every incoming order is
//! coerced to immediate-or-cancel before it reaches the book, so nothing
//! it can't fill immediately ever rests. Demonstrates that a plugin swap
//! can change execution semantics, not just internal bookkeeping.

use meridian_core::core::types::{Order, TimeInForce};
use meridian_core::orderbook::{MatchOutcome, OrderBook};
use meridian_core::plugins::{MatchingAlgorithm, PerformanceProfile, PluginInfo};
use semver::Version;

pub struct ImmediateOrCancelSweepAlgorithm {
    info: PluginInfo,
}

impl ImmediateOrCancelSweepAlgorithm {
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                name: "ioc-sweep".to_string(),
                version: Version::new(1, 0, 0),
                min_core_version: Version::new(0, 1, 0),
                max_core_version: Version::new(0, 99, 0),
                dependencies: vec!["price-time-priority".to_string()],
                performance_profile: PerformanceProfile::ThroughputOptimized,
            },
        }
    }
}

impl Default for ImmediateOrCancelSweepAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingAlgorithm for ImmediateOrCancelSweepAlgorithm {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn match_order(&self, book: &mut OrderBook, mut order: Order) -> MatchOutcome {
        order.time_in_force = TimeInForce::Ioc;
        book.submit(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::core::types::{AccountId, OrderId, OrderStatus, OrderType, Side};
    use rust_decimal_macros::dec;

    #[test]
    fn unfilled_residual_is_cancelled_not_rested() {
        let algo = ImmediateOrCancelSweepAlgorithm::new();
        let mut book = OrderBook::new("BTC-USD");

        let outcome = algo.match_order(
            &mut book,
            Order::new(
                OrderId::generate(),
                "taker",
                "u1",
                AccountId::from("acct-1"),
                "BTC-USD",
                Side::Buy,
                OrderType::Limit,
                dec!(1),
                Some(dec!(100)),
                TimeInForce::Gtc,
            ),
        );

        assert!(outcome.trades.is_empty());
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert!(book.is_empty());
    }
}
