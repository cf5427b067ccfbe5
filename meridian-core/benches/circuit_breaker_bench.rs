//! Benchmark: Circuit Breaker Performance
//!
//! Measures the hot-path cost of the two breaker types on the ingress
//! path: the atomic-FSM software breaker checked before every
//! downstream call, and the regulatory halt flag checked by the risk
//! gate on every order.

use meridian_core::resilience::{CircuitBreaker, CircuitBreakerConfig};
use meridian_core::risk::{HaltReason, RegulatoryCircuitBreaker};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_is_call_permitted_closed(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker/software");
    group.significance_level(0.01).sample_size(10000);

    let breaker = CircuitBreaker::new("bench", CircuitBreakerConfig::default());

    group.bench_function("is_call_permitted_closed", |b| {
        b.iter(|| black_box(breaker.is_call_permitted()));
    });

    group.finish();
}

fn bench_record_success_and_failure(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker/software");
    group.significance_level(0.01).sample_size(10000);

    let breaker = CircuitBreaker::new("bench", CircuitBreakerConfig::default());

    group.bench_function("record_success", |b| {
        b.iter(|| breaker.record_success());
    });

    let failing = CircuitBreaker::new("bench-fail", CircuitBreakerConfig::conservative());
    group.bench_function("record_failure", |b| {
        b.iter(|| failing.record_failure());
    });

    group.finish();
}

fn bench_regulatory_breaker(c: &mut Criterion) {
    let mut group = c.benchmark_group("circuit_breaker/regulatory");
    group.significance_level(0.01).sample_size(10000);

    let untripped = RegulatoryCircuitBreaker::new("BTC-USD");
    group.bench_function("is_triggered_untripped", |b| {
        b.iter(|| black_box(untripped.is_triggered()));
    });

    group.bench_function("trip_then_reset", |b| {
        b.iter(|| {
            let mut breaker = RegulatoryCircuitBreaker::new("BTC-USD");
            breaker.trip(HaltReason::Manual);
            black_box(breaker.is_triggered());
            breaker.reset();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_is_call_permitted_closed,
    bench_record_success_and_failure,
    bench_regulatory_breaker,
);
criterion_main!(benches);
