//! Test fixtures shared across unit and integration tests: order/trade
//! builders and a scratch order book, so test setup reads as intent
//! rather than a wall of `Order::new(...)` arguments.

pub mod helpers;

pub use helpers::*;
