//! The default matching algorithm: strict price-time priority, delegating
//! straight to [`OrderBook::submit`], which already implements the
//! matching loop described for it.

use meridian_core::core::types::Order;
use meridian_core::orderbook::{MatchOutcome, OrderBook};
use meridian_core::plugins::{MatchingAlgorithm, PerformanceProfile, PluginInfo};
use semver::Version;

pub struct PriceTimeAlgorithm {
    info: PluginInfo,
}

impl PriceTimeAlgorithm {
    pub fn new() -> Self {
        Self {
            info: PluginInfo {
                name: "price-time-priority".to_string(),
                version: Version::new(1, 0, 0),
                min_core_version: Version::new(0, 1, 0),
                max_core_version: Version::new(0, 99, 0),
                dependencies: Vec::new(),
                performance_profile: PerformanceProfile::LowLatency,
            },
        }
    }
}

impl Default for PriceTimeAlgorithm {
    fn default() -> Self {
        Self::new()
    }
}

impl MatchingAlgorithm for PriceTimeAlgorithm {
    fn info(&self) -> &PluginInfo {
        &self.info
    }

    fn match_order(&self, book: &mut OrderBook, order: Order) -> MatchOutcome {
        book.submit(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_core::core::types::{AccountId, OrderId, OrderType, Side, TimeInForce};
    use rust_decimal_macros::dec;

    #[test]
    fn matches_a_crossing_order() {
        let algo = PriceTimeAlgorithm::new();
        let mut book = OrderBook::new("BTC-USD");
        book.submit(Order::new(
            OrderId::generate(),
            "resting",
            "u1",
            AccountId::from("acct-1"),
            "BTC-USD",
            Side::Sell,
            OrderType::Limit,
            dec!(1),
            Some(dec!(100)),
            TimeInForce::Gtc,
        ));

        let outcome = algo.match_order(
            &mut book,
            Order::new(
                OrderId::generate(),
                "taker",
                "u2",
                AccountId::from("acct-2"),
                "BTC-USD",
                Side::Buy,
                OrderType::Limit,
                dec!(1),
                Some(dec!(100)),
                TimeInForce::Gtc,
            ),
        );

        assert_eq!(outcome.trades.len(), 1);
    }
}
