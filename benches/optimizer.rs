//! Optimizer benchmarks: beam width and series length scaling.
//!
//! Run with: cargo bench --bench optimizer

#[path = "common/mod.rs"]
mod common;

use common::criterion_config::fast_criterion;
use common::data::noisy_curve;

use featbin::{BinOptimizer, OptimizerConfig, Parallelism};

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn optimizer(beam_width: usize, max_bins: usize, parallelism: Parallelism) -> BinOptimizer {
    BinOptimizer::new(
        OptimizerConfig::builder()
            .beam_width(beam_width)
            .max_bins(max_bins)
            .parallelism(parallelism)
            .build()
            .unwrap(),
    )
}

fn bench_beam_width(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer/beam_width");
    let weights = noisy_curve(2_000, 42);
    group.throughput(Throughput::Elements(weights.len() as u64));

    for beam in [1usize, 4, 16, 64] {
        let opt = optimizer(beam, 16, Parallelism::Sequential);
        group.bench_with_input(BenchmarkId::from_parameter(beam), &weights, |b, w| {
            b.iter(|| black_box(opt.optimize(black_box(w))))
        });
    }
    group.finish();
}

fn bench_series_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer/series_length");

    for n in [500usize, 2_000, 8_000] {
        let weights = noisy_curve(n, 7);
        group.throughput(Throughput::Elements(n as u64));
        let opt = optimizer(16, 16, Parallelism::Sequential);
        group.bench_with_input(BenchmarkId::from_parameter(n), &weights, |b, w| {
            b.iter(|| black_box(opt.optimize(black_box(w))))
        });
    }
    group.finish();
}

fn bench_parallel_pruning(c: &mut Criterion) {
    let mut group = c.benchmark_group("optimizer/pruning");
    let weights = noisy_curve(4_000, 11);
    group.throughput(Throughput::Elements(weights.len() as u64));

    for (label, parallelism) in [
        ("sequential", Parallelism::Sequential),
        ("parallel", Parallelism::Parallel),
    ] {
        let opt = optimizer(64, 32, parallelism);
        group.bench_function(label, |b| b.iter(|| black_box(opt.optimize(black_box(&weights)))));
    }
    group.finish();
}

criterion_group! {
    name = benches;
    config = fast_criterion();
    targets = bench_beam_width, bench_series_length, bench_parallel_pruning
}
criterion_main!(benches);
