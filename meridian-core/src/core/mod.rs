//! Core domain types shared across the order book, risk gate and engine.
//!
//! - `types`: `Order`, `Trade`, `OrderId`, status enums, and the
//!   cache-aligned atomic `Position`.
//! - `errors`: the closed execution error taxonomy plus arithmetic
//!   overflow errors.

pub mod errors;
#[cfg(test)]
mod fixed_point_proptest;
pub mod types;

pub use errors::{ExecutionError, OverflowError, RiskRejectionReason};
pub use types::{
    AccountId, Order, OrderId, OrderStatus, OrderType, Position, Side, Symbol, TimeInForce,
    Trade, FIXED_POINT_SCALE,
};
