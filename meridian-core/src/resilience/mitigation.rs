//! Composes the resilience primitives into a single ordered pipeline for
//! one logical operation: `Retry(Bulkhead(Timeout(RateLimiter(CircuitBreaker(body)))))`.
//!
//! Each layer is optional in the sense that the pipeline skips a layer
//! that wasn't configured, but the ordering itself is fixed — it is the
//! one piece of this module callers should not be able to get wrong.

use crate::resilience::backoff::{BackoffConfig, ExponentialBackoff};
use crate::resilience::bulkhead::Bulkhead;
use crate::resilience::circuit_breaker::CircuitBreaker;
use crate::resilience::rate_limiter::RateLimiter;
use crate::resilience::timeout::TimeoutPolicy;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MitigationError<E> {
    CircuitOpen,
    RateLimited,
    TimedOut,
    BulkheadFull,
    RetriesExhausted,
    Operation(E),
}

impl<E: std::fmt::Display> std::fmt::Display for MitigationError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MitigationError::CircuitOpen => write!(f, "circuit open"),
            MitigationError::RateLimited => write!(f, "rate limited"),
            MitigationError::TimedOut => write!(f, "timed out"),
            MitigationError::BulkheadFull => write!(f, "bulkhead full"),
            MitigationError::RetriesExhausted => write!(f, "retries exhausted"),
            MitigationError::Operation(e) => write!(f, "{}", e),
        }
    }
}

pub struct MitigationSystem {
    pub name: String,
    pub circuit_breaker: CircuitBreaker,
    pub rate_limiter: Option<RateLimiter>,
    pub bulkhead: Option<Arc<Bulkhead>>,
    pub timeout: Option<Arc<TimeoutPolicy>>,
    pub backoff_config: BackoffConfig,
}

impl MitigationSystem {
    /// Run `op` through the full pipeline. `op` is called once per retry
    /// attempt; `classify_retryable` decides whether the operation's own
    /// error should be retried (the wrapper-layer errors — circuit open,
    /// rate limited, bulkhead full, timeout — are always retryable).
    pub async fn run<F, Fut, T, E>(
        &self,
        operation_name: &str,
        mut op: F,
        classify_retryable: impl Fn(&E) -> bool,
    ) -> Result<T, MitigationError<E>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut backoff = ExponentialBackoff::with_config(self.backoff_config.clone());

        loop {
            let attempt_result = self.run_once(operation_name, &mut op).await;

            match attempt_result {
                Ok(v) => {
                    self.circuit_breaker.record_success();
                    return Ok(v);
                }
                Err(err) => {
                    let retryable = match &err {
                        MitigationError::Operation(inner) => classify_retryable(inner),
                        _ => true,
                    };
                    if matches!(err, MitigationError::Operation(_)) {
                        self.circuit_breaker.record_failure();
                    }

                    if !retryable {
                        return Err(err);
                    }
                    match backoff.next_delay() {
                        Some(delay) => tokio::time::sleep(delay).await,
                        None => return Err(MitigationError::RetriesExhausted),
                    }
                }
            }
        }
    }

    async fn run_once<F, Fut, T, E>(
        &self,
        operation_name: &str,
        op: &mut F,
    ) -> Result<T, MitigationError<E>>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        // Bulkhead slot is acquired before the timeout clock starts, so a
        // queued-up caller doesn't burn its own timeout budget waiting for
        // concurrency headroom that has nothing to do with the call itself.
        let _permit = match &self.bulkhead {
            Some(bulkhead) => Some(
                bulkhead
                    .enter()
                    .await
                    .map_err(|_| MitigationError::BulkheadFull)?,
            ),
            None => None,
        };

        let gated = async {
            if !self.circuit_breaker.is_call_permitted() {
                return Err(MitigationError::CircuitOpen);
            }
            if let Some(limiter) = &self.rate_limiter {
                if !limiter.allow() {
                    return Err(MitigationError::RateLimited);
                }
            }
            op().await.map_err(MitigationError::Operation)
        };

        match &self.timeout {
            Some(policy) => {
                let budget = policy.budget_for(operation_name);
                match tokio::time::timeout(budget, gated).await {
                    Ok(inner) => inner,
                    Err(_) => Err(MitigationError::TimedOut),
                }
            }
            None => gated.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::CircuitBreakerConfig;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn system() -> MitigationSystem {
        MitigationSystem {
            name: "test".into(),
            circuit_breaker: CircuitBreaker::new("test", CircuitBreakerConfig {
                failure_threshold: 2,
                ..CircuitBreakerConfig::aggressive()
            }),
            rate_limiter: None,
            bulkhead: None,
            timeout: None,
            backoff_config: BackoffConfig {
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(5),
                multiplier: 1.5,
                max_retries: Some(3),
                jitter_factor: 0.0,
            },
        }
    }

    #[tokio::test]
    async fn succeeds_on_first_try() {
        let sys = system();
        let result = sys
            .run("op", || async { Ok::<_, &str>(1) }, |_| true)
            .await;
        assert_eq!(result, Ok(1));
    }

    #[tokio::test]
    async fn retries_retryable_errors_then_succeeds() {
        let sys = system();
        let attempts = AtomicUsize::new(0);
        let result = sys
            .run(
                "op",
                || async {
                    let n = attempts.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("transient")
                    } else {
                        Ok(7)
                    }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(7));
    }

    #[tokio::test]
    async fn non_retryable_errors_stop_immediately() {
        let sys = system();
        let attempts = AtomicUsize::new(0);
        let result: Result<i32, _> = sys
            .run(
                "op",
                || async {
                    attempts.fetch_add(1, Ordering::SeqCst);
                    Err::<i32, _>("fatal")
                },
                |_| false,
            )
            .await;
        assert!(matches!(result, Err(MitigationError::Operation("fatal"))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn circuit_opens_after_consecutive_failures() {
        let sys = system();
        for _ in 0..2 {
            let _ = sys
                .run("op", || async { Err::<i32, _>("boom") }, |_| false)
                .await;
        }
        let result: Result<i32, MitigationError<&str>> = sys
            .run("op", || async { Ok(1) }, |_: &&str| true)
            .await;
        assert_eq!(result, Err(MitigationError::CircuitOpen));
    }
}
