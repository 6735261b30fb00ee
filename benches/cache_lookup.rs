//! Pattern cache throughput
//!
//! Measures hits on a held handle, rebuilds under the weak policy, and hits
//! under LRU retention, single-threaded and with contention.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rexvm::{CachePolicy, Engine, EngineConfig, FlagSet};
use std::thread;

fn engine(cache_policy: CachePolicy) -> Engine {
    Engine::with_config(EngineConfig {
        cache_policy,
        ..EngineConfig::default()
    })
}

fn bench_hit(c: &mut Criterion) {
    let engine = engine(CachePolicy::Weak);
    let _held = engine.get_or_create("(\\w+)@(\\w+)", FlagSet::empty());
    c.bench_function("cache/hit", |b| {
        b.iter(|| engine.get_or_create(black_box("(\\w+)@(\\w+)"), FlagSet::empty()))
    });
}

fn bench_weak_rebuild(c: &mut Criterion) {
    let engine = engine(CachePolicy::Weak);
    c.bench_function("cache/weak_rebuild", |b| {
        b.iter(|| engine.get_or_create(black_box("(\\w+)@(\\w+)"), FlagSet::empty()))
    });
}

fn bench_lru_working_set(c: &mut Criterion) {
    let patterns: Vec<String> = (0..64).map(|i| format!("key{}=(\\d+)", i)).collect();
    let mut group = c.benchmark_group("cache/lru");
    for capacity in [16usize, 128] {
        let engine = engine(CachePolicy::Lru { capacity });
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &patterns, |b, patterns| {
            b.iter(|| {
                for pattern in patterns {
                    black_box(engine.get_or_create(pattern, FlagSet::empty()));
                }
            })
        });
    }
    group.finish();
}

fn bench_contended_hit(c: &mut Criterion) {
    let engine = engine(CachePolicy::Weak);
    let _held = engine.get_or_create("a+b", FlagSet::empty());
    c.bench_function("cache/contended_hit", |b| {
        b.iter(|| {
            thread::scope(|scope| {
                for _ in 0..4 {
                    scope.spawn(|| {
                        for _ in 0..100 {
                            black_box(engine.get_or_create("a+b", FlagSet::empty()));
                        }
                    });
                }
            })
        })
    });
}

criterion_group!(
    benches,
    bench_hit,
    bench_weak_rebuild,
    bench_lru_working_set,
    bench_contended_hit
);
criterion_main!(benches);
