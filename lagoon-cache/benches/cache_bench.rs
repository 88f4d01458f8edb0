//! Criterion benchmarks for Lagoon cache hot paths: get hit/miss, put, clean.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

use lagoon_cache::{Cache, CacheConfig};
use lagoon_core::clock::SystemClock;
use lagoon_sweep::{SweepRegistry, Sweeper};

/// Cache wired to an isolated sweeper with the traffic trigger disabled,
/// so the benchmarks measure cache work only.
fn bench_cache() -> Cache<String, u64> {
    let sweeper = Sweeper::with_parts(
        Arc::new(SweepRegistry::new()),
        Arc::new(SystemClock::new()),
        u64::MAX,
        0,
    );
    Cache::with_parts(
        CacheConfig::new()
            .idle_timeout_ms(60_000)
            .sweep_trigger_one_in(0),
        Arc::new(SystemClock::new()),
        sweeper,
    )
}

fn bench_get_hit(c: &mut Criterion) {
    let cache = bench_cache();
    cache.put("key".to_string(), 42);
    let key = "key".to_string();

    let mut g = c.benchmark_group("get");
    g.throughput(Throughput::Elements(1));
    g.bench_function("hit", |b| {
        b.iter(|| black_box(cache.get(black_box(&key))));
    });
    g.finish();
}

fn bench_get_miss(c: &mut Criterion) {
    let cache = bench_cache();
    let key = "absent".to_string();

    let mut g = c.benchmark_group("get");
    g.throughput(Throughput::Elements(1));
    g.bench_function("miss", |b| {
        b.iter(|| black_box(cache.get(black_box(&key))));
    });
    g.finish();
}

fn bench_put(c: &mut Criterion) {
    let cache = bench_cache();

    let mut g = c.benchmark_group("put");
    g.throughput(Throughput::Elements(1));
    g.bench_function("overwrite", |b| {
        b.iter(|| cache.put(black_box("key".to_string()), black_box(7)));
    });
    g.finish();
}

fn bench_clean(c: &mut Criterion) {
    let cache = bench_cache();
    for i in 0..1_000u64 {
        cache.put(format!("k{i}"), i);
    }

    let mut g = c.benchmark_group("clean");
    g.throughput(Throughput::Elements(1_000));
    g.bench_function("fresh_1000", |b| {
        b.iter(|| black_box(cache.clean()));
    });
    g.finish();
}

criterion_group!(benches, bench_get_hit, bench_get_miss, bench_put, bench_clean);
criterion_main!(benches);
