//! Circuit breaker pattern for preventing cascade failures.
//!
//! Three-state breaker: Closed (normal) → Open (tripped, fails fast) →
//! HalfOpen (probing recovery) → Closed | Open. State is a single atomic
//! byte; counters are separate atomics so the hot-path `is_call_permitted`
//! check never takes a lock.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CircuitState {
    Closed = 0,
    Open = 1,
    HalfOpen = 2,
}

impl From<u8> for CircuitState {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Closed,
            1 => Self::Open,
            2 => Self::HalfOpen,
            _ => Self::Closed,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u64,
    pub failure_window: Duration,
    pub timeout: Duration,
    pub success_threshold: u64,
    /// Maximum number of in-flight probe calls allowed while HalfOpen.
    /// Extra callers are treated as not-permitted until a probe completes.
    pub half_open_max_probes: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            failure_window: Duration::from_secs(60),
            timeout: Duration::from_secs(30),
            success_threshold: 2,
            half_open_max_probes: 1,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn aggressive() -> Self {
        Self {
            failure_threshold: 3,
            failure_window: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            success_threshold: 2,
            half_open_max_probes: 1,
        }
    }

    pub fn conservative() -> Self {
        Self {
            failure_threshold: 10,
            failure_window: Duration::from_secs(120),
            timeout: Duration::from_secs(60),
            success_threshold: 5,
            half_open_max_probes: 2,
        }
    }
}

type TransitionHook = Arc<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

/// Circuit breaker. Cheap to `Clone` — every clone shares the same atomic
/// state and participates in the same probe budget.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    state: Arc<AtomicU8>,
    failure_count: Arc<AtomicU64>,
    success_count: Arc<AtomicU64>,
    in_flight_probes: Arc<AtomicU64>,
    last_failure_time: Arc<parking_lot::Mutex<Option<Instant>>>,
    last_state_change: Arc<parking_lot::Mutex<Instant>>,
    hooks: Arc<parking_lot::Mutex<Vec<TransitionHook>>>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(breaker = %name, ?config, "creating circuit breaker");
        Self {
            name,
            config,
            state: Arc::new(AtomicU8::new(CircuitState::Closed as u8)),
            failure_count: Arc::new(AtomicU64::new(0)),
            success_count: Arc::new(AtomicU64::new(0)),
            in_flight_probes: Arc::new(AtomicU64::new(0)),
            last_failure_time: Arc::new(parking_lot::Mutex::new(None)),
            last_state_change: Arc::new(parking_lot::Mutex::new(Instant::now())),
            hooks: Arc::new(parking_lot::Mutex::new(Vec::new())),
        }
    }

    /// Register a hook invoked on every state transition. Hooks run on a
    /// detached thread so a slow subscriber never adds latency to the
    /// calling operation.
    pub fn on_transition<F>(&self, hook: F)
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.hooks.lock().push(Arc::new(hook));
    }

    /// Whether a call may proceed right now. In `HalfOpen`, permits at
    /// most `half_open_max_probes` concurrent callers; callers that are
    /// denied should treat this identically to `Open`.
    pub fn is_call_permitted(&self) -> bool {
        let state: CircuitState = self.state.load(Ordering::Acquire).into();

        match state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                let last_change = *self.last_state_change.lock();
                if last_change.elapsed() >= self.config.timeout {
                    self.transition_to_half_open();
                    self.try_acquire_probe()
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => self.try_acquire_probe(),
        }
    }

    fn try_acquire_probe(&self) -> bool {
        let mut current = self.in_flight_probes.load(Ordering::Acquire);
        loop {
            if current >= self.config.half_open_max_probes {
                return false;
            }
            match self.in_flight_probes.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn release_probe_if_half_open(&self) {
        let state: CircuitState = self.state.load(Ordering::Acquire).into();
        if state == CircuitState::HalfOpen {
            let _ = self
                .in_flight_probes
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |v| {
                    Some(v.saturating_sub(1))
                });
        }
    }

    pub fn record_success(&self) {
        let state: CircuitState = self.state.load(Ordering::Acquire).into();
        match state {
            CircuitState::Closed => {
                self.failure_count.store(0, Ordering::Release);
            }
            CircuitState::HalfOpen => {
                self.release_probe_if_half_open();
                let successes = self.success_count.fetch_add(1, Ordering::AcqRel) + 1;
                if successes >= self.config.success_threshold {
                    self.transition_to_closed();
                }
            }
            CircuitState::Open => {}
        }
    }

    pub fn record_failure(&self) {
        let state: CircuitState = self.state.load(Ordering::Acquire).into();
        *self.last_failure_time.lock() = Some(Instant::now());

        match state {
            CircuitState::Closed => {
                let failures = self.failure_count.fetch_add(1, Ordering::AcqRel) + 1;
                if failures >= self.config.failure_threshold {
                    if let Some(last_failure) = *self.last_failure_time.lock() {
                        if last_failure.elapsed() <= self.config.failure_window {
                            self.transition_to_open();
                        }
                    }
                }
            }
            CircuitState::HalfOpen => {
                self.release_probe_if_half_open();
                self.transition_to_open();
            }
            CircuitState::Open => {}
        }
    }

    fn fire_hooks(&self, from: CircuitState, to: CircuitState) {
        let hooks = self.hooks.lock().clone();
        if hooks.is_empty() {
            return;
        }
        std::thread::spawn(move || {
            for hook in &hooks {
                hook(from, to);
            }
        });
    }

    fn transition_to_closed(&self) {
        let from = self.state.load(Ordering::Acquire).into();
        info!(breaker = %self.name, "circuit breaker -> CLOSED");
        self.state.store(CircuitState::Closed as u8, Ordering::Release);
        self.failure_count.store(0, Ordering::Release);
        self.success_count.store(0, Ordering::Release);
        self.in_flight_probes.store(0, Ordering::Release);
        *self.last_state_change.lock() = Instant::now();
        self.fire_hooks(from, CircuitState::Closed);
    }

    fn transition_to_open(&self) {
        let from = self.state.load(Ordering::Acquire).into();
        warn!(breaker = %self.name, "circuit breaker TRIPPED -> OPEN");
        self.state.store(CircuitState::Open as u8, Ordering::Release);
        self.success_count.store(0, Ordering::Release);
        self.in_flight_probes.store(0, Ordering::Release);
        *self.last_state_change.lock() = Instant::now();
        self.fire_hooks(from, CircuitState::Open);
    }

    fn transition_to_half_open(&self) {
        let from = self.state.load(Ordering::Acquire).into();
        debug!(breaker = %self.name, "circuit breaker -> HALF_OPEN (probing)");
        self.state.store(CircuitState::HalfOpen as u8, Ordering::Release);
        self.failure_count.store(0, Ordering::Release);
        self.success_count.store(0, Ordering::Release);
        *self.last_state_change.lock() = Instant::now();
        self.fire_hooks(from, CircuitState::HalfOpen);
    }

    pub fn state(&self) -> CircuitState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Acquire)
    }

    pub fn success_count(&self) -> u64 {
        self.success_count.load(Ordering::Acquire)
    }

    pub fn reset(&self) {
        info!(breaker = %self.name, "circuit breaker manually reset to CLOSED");
        self.transition_to_closed();
    }

    pub fn force_open(&self) {
        warn!(breaker = %self.name, "circuit breaker manually forced to OPEN");
        self.transition_to_open();
    }
}

impl Clone for CircuitBreaker {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            failure_count: Arc::clone(&self.failure_count),
            success_count: Arc::clone(&self.success_count),
            in_flight_probes: Arc::clone(&self.in_flight_probes),
            last_failure_time: Arc::clone(&self.last_failure_time),
            last_state_change: Arc::clone(&self.last_state_change),
            hooks: Arc::clone(&self.hooks),
        }
    }
}
