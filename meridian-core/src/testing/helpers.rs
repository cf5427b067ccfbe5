//! Builders for the values most tests need: a limit or market order on a
//! fixed symbol/account pair, and an empty book to submit them to.

use crate::core::types::{
    AccountId, Order, OrderId, OrderType, Side, Symbol, TimeInForce,
};
use crate::orderbook::OrderBook;
use rust_decimal::Decimal;

/// Build a GTC limit order. `client_order_id`/`user_id` are filled with
/// placeholders since most tests only care about side, price and qty.
pub fn limit_order(account: &str, symbol: &str, side: Side, qty: Decimal, price: Decimal) -> Order {
    Order::new(
        OrderId::generate(),
        "test-client-order",
        "test-user",
        AccountId::from(account),
        symbol,
        side,
        OrderType::Limit,
        qty,
        Some(price),
        TimeInForce::Gtc,
    )
}

/// Build a market order with no resting price.
pub fn market_order(account: &str, symbol: &str, side: Side, qty: Decimal) -> Order {
    Order::new(
        OrderId::generate(),
        "test-client-order",
        "test-user",
        AccountId::from(account),
        symbol,
        side,
        OrderType::Market,
        qty,
        None,
        TimeInForce::Ioc,
    )
}

/// Build a GTC stop order triggered at `stop_price`. Releases as a market
/// order once the book's last trade price crosses it.
pub fn stop_order(account: &str, symbol: &str, side: Side, qty: Decimal, stop_price: Decimal) -> Order {
    let mut order = Order::new(
        OrderId::generate(),
        "test-client-order",
        "test-user",
        AccountId::from(account),
        symbol,
        side,
        OrderType::Stop,
        qty,
        None,
        TimeInForce::Gtc,
    );
    order.stop_price = Some(stop_price);
    order
}

/// Build a GTC stop-limit order: held until `stop_price` triggers, then
/// released as a limit order resting at `price`.
pub fn stop_limit_order(
    account: &str,
    symbol: &str,
    side: Side,
    qty: Decimal,
    stop_price: Decimal,
    price: Decimal,
) -> Order {
    let mut order = Order::new(
        OrderId::generate(),
        "test-client-order",
        "test-user",
        AccountId::from(account),
        symbol,
        side,
        OrderType::StopLimit,
        qty,
        Some(price),
        TimeInForce::Gtc,
    );
    order.stop_price = Some(stop_price);
    order
}

/// Build an empty order book for `symbol`.
pub fn empty_book(symbol: &str) -> OrderBook {
    OrderBook::new(symbol)
}

/// A throwaway but distinct symbol, useful when a test needs a book that
/// cannot collide with fixtures used elsewhere in the same module.
pub fn test_symbol() -> Symbol {
    "TEST-USD".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn limit_order_carries_the_requested_side_and_price() {
        let order = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
        assert_eq!(order.side, Side::Buy);
        assert_eq!(order.price, Some(dec!(100)));
        assert_eq!(order.quantity, dec!(1));
    }

    #[test]
    fn market_order_has_no_price() {
        let order = market_order("acct-1", "BTC-USD", Side::Sell, dec!(2));
        assert_eq!(order.price, None);
        assert_eq!(order.order_type, OrderType::Market);
    }

    #[test]
    fn empty_book_has_no_best_bid_or_ask() {
        let book = empty_book("BTC-USD");
        assert!(book.best_bid().is_none());
        assert!(book.best_ask().is_none());
    }
}
