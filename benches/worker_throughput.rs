//! Benchmarks for the worker-thread boundary
//!
//! Measures items per second across `threaded_worker` + `flatten` at the
//! capacities used by the pipeline (10 encoded packets, 1024 fragments).

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use framewire::stream::{flatten, publishers, threaded_worker};
use framewire::test_utils::encoded_frames;
use std::hint::black_box;

const ITEMS: u64 = 10_000;

fn bench_worker_capacity(c: &mut Criterion) {
    let mut group = c.benchmark_group("threaded_worker");
    group.throughput(Throughput::Elements(ITEMS));

    for capacity in [1usize, 10, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                let mut sum = 0u64;
                publishers::from_iter(0..ITEMS)
                    .pipe(threaded_worker("bench", capacity))
                    .pipe(flatten())
                    .for_each(|x| sum += x)
                    .expect("worker");
                black_box(sum)
            })
        });
    }

    group.finish();
}

fn bench_packet_handoff(c: &mut Criterion) {
    let frames = encoded_frames(1000, 16 * 1024);

    c.bench_function("encoded_packets_across_worker", |b| {
        b.iter(|| {
            let count = publishers::of(frames.clone())
                .pipe(threaded_worker("bench.encoded", 10))
                .pipe(flatten())
                .collect()
                .expect("worker")
                .len();
            black_box(count)
        })
    });
}

criterion_group!(benches, bench_worker_capacity, bench_packet_handoff);
criterion_main!(benches);
