//! Hot-path performance primitives shared by the order book and pipeline:
//! cache-aligned atomic counters and object pools for the pooled order
//! and message structures the pipeline reuses across requests.

pub mod metrics;
pub mod pools;

pub use metrics::{CacheAligned, Metrics, MetricsSnapshot};
pub use pools::{ObjectPool, PoolGuard, PoolStats};
