//! Reference matching-algorithm and strategy plugins implementing
//! `meridian_core::plugins`'s ABI. Carries no real strategy logic (an
//! explicit non-goal of this workspace) — exists to give the core's
//! plugin registry and component coordinator something real to
//! register, version-check, construct lazily, and hot-swap.

pub mod ioc_sweep;
pub mod noop_strategy;
pub mod price_time;

pub use ioc_sweep::ImmediateOrCancelSweepAlgorithm;
pub use noop_strategy::NoopStrategy;
pub use price_time::PriceTimeAlgorithm;
