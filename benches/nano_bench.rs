//! Benchmark for the runtime: combinator chains, interpreters and refs.
//!
//! Measures the per-step cost of resuming computations and of answering
//! effects through nested interpreters.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nano_effect::control::{run, run_with};
use nano_effect::effect::{Effect, Ref, Tag, emit, observe, provide, with_env, with_refs};
use nano_effect::nano::{self, Boxed, Nano};
use nano_effect::{Value, define_ref, define_tag};
use std::hint::black_box;

define_tag! { Factor: i64 }

define_ref! { Counter: i64 = 0 }

// =============================================================================
// Combinator Benchmarks
// =============================================================================

fn benchmark_map_chain(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("map_chain");

    group.bench_function("map_1", |bencher| {
        let program = nano::of::<(), _>(1).map(|x| x + 1);
        bencher.iter(|| black_box(run(black_box(program.clone()))));
    });

    // Adjacent maps fuse into a single node
    group.bench_function("map_5", |bencher| {
        let program = nano::of::<(), _>(1)
            .map(|x| x + 1)
            .map(|x| x * 2)
            .map(|x| x + 3)
            .map(|x| x * 4)
            .map(|x| x + 5);
        bencher.iter(|| black_box(run(black_box(program.clone()))));
    });

    group.finish();
}

fn flat_map_chain(depth: usize) -> Boxed<i64, i64> {
    let mut program = nano::of::<i64, _>(0_i64).boxed();
    for _ in 0..depth {
        program = program
            .flat_map(|x| nano::suspend::<i64, _>(x).map(|answer| answer + 1))
            .boxed();
    }
    program
}

fn benchmark_flat_map_chain(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("flat_map_chain");

    for depth in [10, 100, 1000] {
        let program = flat_map_chain(depth);
        group.bench_with_input(BenchmarkId::from_parameter(depth), &program, |bencher, program| {
            bencher.iter(|| black_box(run_with(program.clone(), |value| Ok(Value::new(value)))));
        });
    }

    group.finish();
}

// =============================================================================
// Interpreter Benchmarks
// =============================================================================

fn benchmark_env_lookup(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("env_lookup");

    for lookups in [1, 10, 100] {
        let mut program = nano::of::<Effect, _>(0_i64).boxed();
        for _ in 0..lookups {
            program = program.flat_map(|sum| Factor.map(move |factor| sum + factor)).boxed();
        }
        let wired = with_env(provide(program, Factor::env(2)));
        group.bench_with_input(BenchmarkId::from_parameter(lookups), &wired, |bencher, wired| {
            bencher.iter(|| black_box(run(wired.clone())));
        });
    }

    group.finish();
}

fn benchmark_refs(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("refs");

    for updates in [1, 10, 100] {
        let mut program = Counter::get().boxed();
        for _ in 0..updates {
            program = program.then(Counter::update(|count| count + 1)).boxed();
        }
        let wired = with_env(with_refs(program));
        group.bench_with_input(BenchmarkId::from_parameter(updates), &wired, |bencher, wired| {
            bencher.iter(|| black_box(run(wired.clone())));
        });
    }

    group.finish();
}

fn benchmark_observe(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("observe");

    for emissions in [10, 100] {
        let mut producer = nano::of::<Effect, _>(()).boxed();
        for index in 0..emissions {
            producer = producer.then(emit(index)).boxed();
        }
        let observed = observe(producer, |_: i32| nano::of(()));
        group.bench_with_input(BenchmarkId::from_parameter(emissions), &observed, |bencher, observed| {
            bencher.iter(|| black_box(run(observed.clone())));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_map_chain,
    benchmark_flat_map_chain,
    benchmark_env_lookup,
    benchmark_refs,
    benchmark_observe
);

criterion_main!(benches);
