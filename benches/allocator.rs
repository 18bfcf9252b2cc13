//! Benchmarks for tieralloc.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;
use tieralloc::{diagnostics, Tier, TierAlloc, TierConfig};

const DURABLE_CAPACITY: usize = 64 << 20;

fn started(config: TierConfig) -> TierAlloc {
    let alloc = TierAlloc::new(config.with_poll_interval(Duration::from_secs(3600)));
    alloc.start().unwrap();
    alloc
}

fn bench_policies(c: &mut Criterion) {
    diagnostics::suppress_diagnostics(true);
    let dir = tempfile::tempdir().unwrap();
    let durable = |config: TierConfig| {
        config
            .with_durable_path(dir.path())
            .with_durable_capacity(DURABLE_CAPACITY)
            .with_log_path(dir.path().join("bench.log"))
    };

    let configs = [
        ("monitor", durable(TierConfig::monitor())),
        ("fixed_volatile", durable(TierConfig::fixed(Tier::Volatile))),
        ("fixed_durable", durable(TierConfig::fixed(Tier::Durable))),
        ("round_robin", durable(TierConfig::round_robin())),
        ("random", durable(TierConfig::random().with_seed(7))),
    ];

    let mut group = c.benchmark_group("allocate_release");
    for (name, config) in configs {
        let alloc = started(config);
        group.bench_function(name, |b| {
            b.iter(|| {
                let p = alloc.allocate(black_box(64));
                unsafe { alloc.release(p) };
            })
        });
        alloc.stop().unwrap();
    }
    group.finish();
}

fn bench_sizes(c: &mut Criterion) {
    diagnostics::suppress_diagnostics(true);
    let dir = tempfile::tempdir().unwrap();
    let alloc = started(
        TierConfig::round_robin()
            .with_durable_path(dir.path())
            .with_durable_capacity(DURABLE_CAPACITY)
            .with_log_path(dir.path().join("bench.log")),
    );

    let mut group = c.benchmark_group("round_robin_sizes");
    for size in [16usize, 256, 4096, 65536] {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let p = alloc.allocate(size);
                unsafe { alloc.release(black_box(p)) };
            })
        });
    }
    group.finish();
    alloc.stop().unwrap();
}

fn bench_resize(c: &mut Criterion) {
    diagnostics::suppress_diagnostics(true);
    let dir = tempfile::tempdir().unwrap();
    let alloc = started(
        TierConfig::fixed(Tier::Durable)
            .with_durable_path(dir.path())
            .with_durable_capacity(DURABLE_CAPACITY)
            .with_log_path(dir.path().join("bench.log")),
    );

    c.bench_function("durable_resize_grow", |b| {
        b.iter(|| unsafe {
            let mut p = alloc.allocate(16);
            for size in [32, 64, 128, 256, 512] {
                p = alloc.resize(p, size);
            }
            alloc.release(black_box(p));
        })
    });
    alloc.stop().unwrap();
}

fn bench_concurrent(c: &mut Criterion) {
    diagnostics::suppress_diagnostics(true);
    let dir = tempfile::tempdir().unwrap();
    let alloc = started(
        TierConfig::round_robin()
            .with_durable_path(dir.path())
            .with_durable_capacity(DURABLE_CAPACITY)
            .with_log_path(dir.path().join("bench.log")),
    );

    c.bench_function("round_robin_4_threads_1000x", |b| {
        b.iter(|| {
            std::thread::scope(|s| {
                for _ in 0..4 {
                    s.spawn(|| {
                        for _ in 0..1000 {
                            let p = alloc.allocate(48);
                            unsafe { alloc.release(p) };
                        }
                    });
                }
            })
        })
    });
    alloc.stop().unwrap();
}

criterion_group!(benches, bench_policies, bench_sizes, bench_resize, bench_concurrent);
criterion_main!(benches);
