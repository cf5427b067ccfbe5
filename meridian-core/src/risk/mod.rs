//! Risk-gated execution: pre-trade limit checks and the per-symbol
//! regulatory circuit breaker that gates order ingress ahead of the
//! matching engine.
//!
//! This is deliberately a thin layer — a single [`gate::RiskGate`] run
//! synchronously on the ingress path, not a multi-stage pipeline of
//! independently configured validators. Software-reliability concerns
//! (retrying a downstream call, rate limiting a noisy client) live in
//! [`crate::resilience`] instead; this module only answers "is this
//! order allowed to trade."

pub mod circuit_breaker;
pub mod gate;
pub mod types;

pub use circuit_breaker::{HaltReason, RegulatoryCircuitBreaker};
pub use gate::{OrderAck, RiskCheckOutcome, RiskGate};
pub use types::RiskLimits;
