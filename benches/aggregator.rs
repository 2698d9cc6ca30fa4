//! Benchmarks for per-generation statistics aggregation.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use symreg::engine::{Expr, Fitness, RawGeneration, SolutionCandidate};
use symreg::run::GenerationAggregator;

fn generation(size: usize, multi_objective: bool) -> RawGeneration {
    let population: Vec<SolutionCandidate> = (0..size)
        .map(|i| {
            let error = (i % 97) as f64 + 0.5;
            let fitness = if multi_objective {
                Fitness::Vector {
                    error,
                    complexity: (i % 64) as f64 / 64.0,
                }
            } else {
                Fitness::Scalar(error)
            };
            SolutionCandidate::new(Expr::Const(error), &[], fitness)
        })
        .collect();
    let best = population[0].clone();
    RawGeneration { population, best }
}

fn bench_scalar_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_scalar");

    for size in [100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let raw = generation(size, false);
            let mut aggregator = GenerationAggregator::new(false, vec![]);
            b.iter(|| aggregator.aggregate(black_box(raw.clone())));
        });
    }

    group.finish();
}

fn bench_vector_aggregation(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate_vector");

    for size in [100, 1_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let raw = generation(size, true);
            let mut aggregator = GenerationAggregator::new(true, vec![]);
            b.iter(|| aggregator.aggregate(black_box(raw.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_scalar_aggregation, bench_vector_aggregation);
criterion_main!(benches);
