//! Atomic Operations Benchmarks
//!
//! Measures the cost of the atomic fields on `Position` and `OrderId`
//! generation, the two structures read and written on every match.

use meridian_core::core::{OrderId, Position};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use std::thread;

fn position_reads_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic/position_reads");
    group.significance_level(0.01).sample_size(10000);

    let position = Position::new();

    group.bench_function("quantity", |b| {
        b.iter(|| black_box(position.quantity()));
    });
    group.bench_function("realized_pnl", |b| {
        b.iter(|| black_box(position.realized_pnl()));
    });
    group.bench_function("daily_pnl", |b| {
        b.iter(|| black_box(position.daily_pnl()));
    });

    group.finish();
}

fn position_updates_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic/position_updates");
    group.significance_level(0.01).sample_size(10000);

    let position = Position::new();

    group.bench_function("update_quantity", |b| {
        b.iter(|| {
            let _ = position.update_quantity(black_box(100_000_000));
        });
    });
    group.bench_function("update_realized_pnl", |b| {
        b.iter(|| {
            let _ = position.update_realized_pnl(black_box(1_000_000_000));
        });
    });
    group.bench_function("update_daily_pnl", |b| {
        b.iter(|| {
            let _ = position.update_daily_pnl(black_box(1_000_000_000));
        });
    });
    group.bench_function("increment_trades", |b| {
        b.iter(|| black_box(position.increment_trades()));
    });

    group.finish();
}

fn orderid_generation_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic/orderid_generation");
    group.significance_level(0.01).sample_size(10000);

    group.bench_function("generate", |b| {
        b.iter(|| black_box(OrderId::generate()));
    });
    group.bench_function("batch_100", |b| {
        b.iter(|| {
            for _ in 0..100 {
                black_box(OrderId::generate());
            }
        });
    });

    group.finish();
}

fn position_contention_bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomic/position_contention");
    group.significance_level(0.01).sample_size(1000);

    let position = Arc::new(Position::new());

    group.bench_function("single_thread", |b| {
        let pos = position.clone();
        b.iter(|| {
            let _ = pos.update_quantity(black_box(100_000_000));
        });
    });

    group.bench_function("4_threads", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let pos = position.clone();
                    thread::spawn(move || {
                        let delta = if i % 2 == 0 { 1_000_000 } else { -1_000_000 };
                        for _ in 0..100 {
                            let _ = pos.update_quantity(delta);
                        }
                    })
                })
                .collect();

            for h in handles {
                h.join().unwrap();
            }
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    position_reads_bench,
    position_updates_bench,
    orderid_generation_bench,
    position_contention_bench
);
criterion_main!(benches);
