//! Benchmarks for dispatch fan-out.
//!
//! Run with: cargo bench -p fanout --bench dispatch_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fanout::{Dispatcher, Emitter};
use std::cell::Cell;
use std::hint::black_box;
use std::rc::Rc;

fn bench_keyed_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter/dispatch");

    for handlers in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(handlers as u64));
        let emitter = Emitter::new();
        let sink = Rc::new(Cell::new(0u64));
        let _subs: Vec<_> = (0..handlers)
            .map(|_| {
                let sink = Rc::clone(&sink);
                emitter.register("tick", move |n: &u64| sink.set(sink.get().wrapping_add(*n)))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("handlers", handlers),
            &emitter,
            |b, emitter| {
                b.iter(|| {
                    emitter.dispatch("tick", black_box(&1u64)).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_unfiltered_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatcher/dispatch");

    for handlers in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(handlers as u64));
        let dispatcher = Dispatcher::new();
        let sink = Rc::new(Cell::new(0u64));
        let _subs: Vec<_> = (0..handlers)
            .map(|_| {
                let sink = Rc::clone(&sink);
                dispatcher.register(move |n: &u64| sink.set(sink.get().wrapping_add(*n)))
            })
            .collect();

        group.bench_with_input(
            BenchmarkId::new("handlers", handlers),
            &dispatcher,
            |b, dispatcher| {
                b.iter(|| {
                    dispatcher.dispatch(black_box(&1u64)).unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_register_unregister(c: &mut Criterion) {
    let mut group = c.benchmark_group("emitter/churn");

    group.bench_function("register_unregister", |b| {
        let emitter: Emitter<u64> = Emitter::new();
        b.iter(|| {
            let sub = emitter.register("tick", |_: &u64| {});
            emitter.unregister(&sub);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_keyed_dispatch,
    bench_unfiltered_dispatch,
    bench_register_unregister
);
criterion_main!(benches);
