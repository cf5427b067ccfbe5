//! Resilience primitives wrapping every external or expensive call:
//! circuit breaker, bulkhead, rate limiter, retry/backoff, timeout, and a
//! bounded TTL cache — composable via [`mitigation::MitigationSystem`].

pub mod backoff;
pub mod bulkhead;
pub mod cache;
pub mod circuit_breaker;
pub mod kill_switch;
pub mod mitigation;
pub mod panic;
pub mod rate_limiter;
pub mod timeout;

pub use backoff::{BackoffConfig, ExponentialBackoff};
pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadError};
pub use cache::{BoundedCache, EvictionPolicy};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use kill_switch::{KillSwitch, KillSwitchState};
pub use mitigation::{MitigationError, MitigationSystem};
pub use panic::install_panic_handler;
pub use rate_limiter::{RateLimiter, RateLimiterConfig};
pub use timeout::{TimeoutExceeded, TimeoutPolicy};
