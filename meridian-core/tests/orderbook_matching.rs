//! End-to-end price-time priority matching against a bare [`OrderBook`],
//! with no risk gate or engine involved.

use meridian_core::core::types::{OrderStatus, OrderType, Side, TimeInForce};
use meridian_core::testing::{empty_book, limit_order, stop_limit_order, stop_order};
use rust_decimal_macros::dec;

#[test]
fn resting_bid_fills_an_incoming_marketable_ask() {
    let mut book = empty_book("BTC-USD");

    let bid = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(2), dec!(100));
    let outcome = book.submit(bid);
    assert!(outcome.trades.is_empty());

    let ask = limit_order("acct-2", "BTC-USD", Side::Sell, dec!(1), dec!(99));
    let outcome = book.submit(ask);

    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].price, dec!(100));
    assert_eq!(outcome.trades[0].quantity, dec!(1));

    // The resting bid had 2 and gave up 1; 1 should still be on the book.
    let snapshot = book.snapshot(5);
    assert_eq!(snapshot.bids, vec![(dec!(100), dec!(1))]);
    assert!(snapshot.asks.is_empty());
}

#[test]
fn price_time_priority_fills_the_earliest_resting_order_first() {
    let mut book = empty_book("BTC-USD");

    book.submit(limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100)));
    book.submit(limit_order("acct-2", "BTC-USD", Side::Buy, dec!(1), dec!(100)));

    let ask = limit_order("acct-3", "BTC-USD", Side::Sell, dec!(1), dec!(100));
    let outcome = book.submit(ask);

    assert_eq!(outcome.trades.len(), 1);
    // Only one unit traded; one bid at 100 x1 remains resting.
    let snapshot = book.snapshot(5);
    assert_eq!(snapshot.bids, vec![(dec!(100), dec!(1))]);
}

#[test]
fn cancel_removes_a_resting_order_from_the_book() {
    let mut book = empty_book("BTC-USD");
    let bid = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
    let id = bid.id;
    book.submit(bid);

    let cancelled = book.cancel(id);
    assert!(cancelled.is_some());
    assert!(book.best_bid().is_none());
}

#[test]
fn amend_changes_resting_quantity_without_losing_priority() {
    let mut book = empty_book("BTC-USD");
    let bid = limit_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(100));
    let id = bid.id;
    book.submit(bid);

    book.amend(id, dec!(5), None).expect("amend of a resting order succeeds");
    let snapshot = book.snapshot(5);
    assert_eq!(snapshot.bids, vec![(dec!(100), dec!(5))]);
}

#[test]
fn market_order_sweeps_the_best_available_price() {
    let mut book = empty_book("BTC-USD");
    book.submit(limit_order("acct-1", "BTC-USD", Side::Sell, dec!(1), dec!(101)));

    let market_buy = meridian_core::testing::market_order("acct-2", "BTC-USD", Side::Buy, dec!(1));
    assert_eq!(market_buy.order_type, OrderType::Market);
    assert_eq!(market_buy.time_in_force, TimeInForce::Ioc);

    let outcome = book.submit(market_buy);
    assert_eq!(outcome.trades.len(), 1);
    assert_eq!(outcome.trades[0].price, dec!(101));
}

#[test]
fn a_stop_order_holds_off_book_and_releases_once_triggered() {
    let mut book = empty_book("BTC-USD");

    let stop = stop_order("acct-1", "BTC-USD", Side::Buy, dec!(1), dec!(105));
    let held = book.submit(stop);
    assert!(held.trades.is_empty());
    assert_eq!(held.order.status, OrderStatus::Pending);
    assert!(book.best_bid().is_none());
    assert_eq!(book.held_stop_count(), 1);

    // A trade at 100 doesn't cross the 105 trigger.
    book.submit(limit_order("acct-2", "BTC-USD", Side::Sell, dec!(1), dec!(100)));
    book.submit(limit_order("acct-3", "BTC-USD", Side::Buy, dec!(1), dec!(100)));
    assert!(book.release_triggered_stops().is_empty());

    // A trade at 110 does.
    book.submit(limit_order("acct-2", "BTC-USD", Side::Sell, dec!(1), dec!(110)));
    book.submit(limit_order("acct-3", "BTC-USD", Side::Buy, dec!(1), dec!(110)));
    let released = book.release_triggered_stops();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].order_type, OrderType::Market);

    let outcome = book.submit(released.into_iter().next().unwrap());
    assert_eq!(outcome.order.status, OrderStatus::Cancelled); // no resting ask left to sweep
}

#[test]
fn a_stop_limit_order_releases_as_a_limit_order_at_its_own_price() {
    let mut book = empty_book("BTC-USD");

    let stop_limit = stop_limit_order("acct-1", "BTC-USD", Side::Sell, dec!(1), dec!(95), dec!(90));
    book.submit(stop_limit);
    assert_eq!(book.held_stop_count(), 1);

    book.submit(limit_order("acct-2", "BTC-USD", Side::Buy, dec!(1), dec!(95)));
    book.submit(limit_order("acct-3", "BTC-USD", Side::Sell, dec!(1), dec!(95)));

    let released = book.release_triggered_stops();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].order_type, OrderType::Limit);
    assert_eq!(released[0].price, Some(dec!(90)));

    book.submit(released.into_iter().next().unwrap());
    assert_eq!(book.best_ask(), Some(dec!(90)));
}
