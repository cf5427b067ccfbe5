//! Meridian Core - Order Matching & Risk-Gated Execution Pipeline
//!
//! Meridian is a multi-asset electronic trading platform's matching core:
//! a symbol-sharded limit order book, a pre-trade risk gate, a hot-swappable
//! matching-algorithm plugin registry, and a lazily constructed component
//! coordinator tying them together under a resilience layer (circuit
//! breakers, bulkheads, rate limiting, retry/backoff, a bounded cache).
//!
//! ## Core Modules
//! - `core`: domain types (`Order`, `Trade`, `Position`, the error taxonomy)
//! - `orderbook`: per-symbol price-time-priority limit order book
//! - `risk`: pre-trade risk gate and regulatory circuit breaker
//! - `engine`: sharded ingress, the per-order pipeline, pipeline-level alerting
//! - `plugins`: matching-algorithm/strategy ABI and the plugin registry
//! - `coordinator`: lazy construction, locking and memory-aware lifecycle
//!   for every long-lived component
//! - `resilience`: circuit breaker, bulkhead, rate limiter, backoff, cache
//! - `config`: TOML + environment runtime configuration
//! - `monitoring`: Prometheus metrics, alert delivery, HTTP scrape server
//! - `wsfanout`: per-client WebSocket fan-out with heartbeats and graceful drain
//! - `perf`: cache-aligned counters and object pools for the hot path
//! - `testing`: fixture builders shared by unit and integration tests

pub mod config;
pub mod coordinator;
pub mod core;
pub mod engine;
pub mod monitoring;
pub mod orderbook;
pub mod perf;
pub mod plugins;
pub mod resilience;
pub mod risk;
pub mod utils;
pub mod wsfanout;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::Config;
pub use core::{
    AccountId, ExecutionError, Order, OrderId, OrderStatus, OrderType, OverflowError, Position,
    RiskRejectionReason, Side, Symbol, TimeInForce, Trade,
};
pub use engine::{MatchingEngine, PipelineEvent, PipelineOutcome};
pub use orderbook::{BookSnapshot, MatchOutcome, OrderBook};
pub use plugins::{MatchingAlgorithm, PluginRegistry, Strategy};
pub use risk::{RegulatoryCircuitBreaker, RiskGate, RiskLimits};

pub use anyhow::{Error, Result};

/// Convenience re-exports for binaries wiring the pipeline together.
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::{
        AccountId, ExecutionError, Order, OrderId, OrderStatus, OrderType, Position, Side,
        Symbol, TimeInForce, Trade,
    };
    pub use crate::coordinator::Coordinator;
    pub use crate::engine::{MatchingEngine, PipelineEvent, PipelineOutcome};
    pub use crate::orderbook::OrderBook;
    pub use crate::plugins::{MatchingAlgorithm, PluginRegistry, Strategy};
    pub use crate::risk::{RiskGate, RiskLimits};
    pub use crate::{Error, Result};
}
