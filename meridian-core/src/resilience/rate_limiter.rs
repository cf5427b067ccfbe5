//! Token-bucket rate limiting.
//!
//! `allow`/`allow_n` are non-blocking and lock-free (a CAS loop over the
//! token count); `wait` additionally polls until a token frees up or a
//! timeout elapses, for callers that would rather back off briefly than
//! be rejected outright.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub max_per_second: u64,
    pub burst_capacity: u64,
    pub refill_rate: f64,
    pub refill_interval: Duration,
}

impl RateLimiterConfig {
    pub fn conservative() -> Self {
        Self {
            max_per_second: 10,
            burst_capacity: 20,
            refill_rate: 10.0,
            refill_interval: Duration::from_secs(1),
        }
    }

    pub fn standard() -> Self {
        Self {
            max_per_second: 100,
            burst_capacity: 100,
            refill_rate: 100.0,
            refill_interval: Duration::from_secs(1),
        }
    }

    pub fn aggressive() -> Self {
        Self {
            max_per_second: 10_000,
            burst_capacity: 2_000,
            refill_rate: 10_000.0,
            refill_interval: Duration::from_secs(1),
        }
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Token-bucket limiter. `Clone` shares the same bucket and counters.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    tokens: Arc<AtomicU64>,
    last_refill: Arc<Mutex<Instant>>,
    total_requests: Arc<AtomicU64>,
    total_allowed: Arc<AtomicU64>,
    total_rejected: Arc<AtomicU64>,
    cumulative_wait_ns: Arc<AtomicU64>,
}

const FIXED_POINT: u64 = 1000;

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        let initial_tokens = config.burst_capacity * FIXED_POINT;
        Self {
            config,
            tokens: Arc::new(AtomicU64::new(initial_tokens)),
            last_refill: Arc::new(Mutex::new(Instant::now())),
            total_requests: Arc::new(AtomicU64::new(0)),
            total_allowed: Arc::new(AtomicU64::new(0)),
            total_rejected: Arc::new(AtomicU64::new(0)),
            cumulative_wait_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn allow(&self) -> bool {
        self.allow_n(1)
    }

    pub fn allow_n(&self, n: u64) -> bool {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.refill();

        let needed = n * FIXED_POINT;
        let mut current = self.tokens.load(Ordering::Acquire);
        loop {
            if current < needed {
                self.total_rejected.fetch_add(1, Ordering::Relaxed);
                if self.total_rejected.load(Ordering::Relaxed) % 1000 == 1 {
                    warn!(
                        allowed = self.total_allowed.load(Ordering::Relaxed),
                        total = self.total_requests.load(Ordering::Relaxed),
                        "rate limit exceeded"
                    );
                }
                return false;
            }
            match self.tokens.compare_exchange_weak(
                current,
                current - needed,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.total_allowed.fetch_add(1, Ordering::Relaxed);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// Block (async) until a token is available or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let poll_interval = Duration::from_millis(1);
        loop {
            if self.allow() {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            let start = Instant::now();
            tokio::time::sleep(poll_interval.min(deadline - Instant::now())).await;
            self.cumulative_wait_ns
                .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
        }
    }

    fn refill(&self) {
        let mut last_refill = self.last_refill.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(*last_refill);
        if elapsed < self.config.refill_interval {
            return;
        }

        let intervals = elapsed.as_secs_f64() / self.config.refill_interval.as_secs_f64();
        let tokens_to_add = (self.config.refill_rate * intervals * FIXED_POINT as f64) as u64;
        if tokens_to_add > 0 {
            let max_tokens = self.config.burst_capacity * FIXED_POINT;
            let current = self.tokens.load(Ordering::Acquire);
            let new_tokens = (current + tokens_to_add).min(max_tokens);
            self.tokens.store(new_tokens, Ordering::Release);
            *last_refill = now;
            debug!(added = tokens_to_add / FIXED_POINT, "rate limiter refilled");
        }
    }

    pub fn available_tokens(&self) -> u64 {
        self.tokens.load(Ordering::Acquire) / FIXED_POINT
    }

    pub fn total_allowed(&self) -> u64 {
        self.total_allowed.load(Ordering::Acquire)
    }

    pub fn total_rejected(&self) -> u64 {
        self.total_rejected.load(Ordering::Acquire)
    }

    pub fn cumulative_wait(&self) -> Duration {
        Duration::from_nanos(self.cumulative_wait_ns.load(Ordering::Acquire))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_burst_then_rejects() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_second: 100,
            burst_capacity: 5,
            refill_rate: 100.0,
            refill_interval: Duration::from_secs(1),
        });
        for _ in 0..5 {
            assert!(limiter.allow());
        }
        assert!(!limiter.allow());
        assert_eq!(limiter.total_rejected(), 1);
    }

    #[test]
    fn refills_after_interval() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_second: 100,
            burst_capacity: 5,
            refill_rate: 10.0,
            refill_interval: Duration::from_millis(50),
        });
        for _ in 0..5 {
            limiter.allow();
        }
        assert!(!limiter.allow());
        std::thread::sleep(Duration::from_millis(70));
        assert!(limiter.allow());
    }

    #[tokio::test]
    async fn wait_unblocks_once_tokens_refill() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_second: 100,
            burst_capacity: 1,
            refill_rate: 100.0,
            refill_interval: Duration::from_millis(20),
        });
        assert!(limiter.allow());
        let allowed = limiter.wait(Duration::from_millis(200)).await;
        assert!(allowed);
    }

    #[tokio::test]
    async fn wait_times_out_if_never_refilled() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_per_second: 1,
            burst_capacity: 1,
            refill_rate: 0.0,
            refill_interval: Duration::from_secs(3600),
        });
        assert!(limiter.allow());
        let allowed = limiter.wait(Duration::from_millis(30)).await;
        assert!(!allowed);
    }
}
