use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use commflag::domain::model::{MediaUnit, StreamKind, TimeSpec};
use commflag::pipeline::BoundedFrameQueue;

const UNITS: u64 = 4096;

fn unit(index: u64) -> MediaUnit {
    MediaUnit::video(TimeSpec::from_seconds(index as f64 * 0.04), 32, 18, vec![128; 32 * 18])
}

/// One blocking producer and one blocking consumer through a single queue
fn bench_queue_handoff(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let mut group = c.benchmark_group("queue_handoff");
    group.throughput(Throughput::Elements(UNITS));

    for capacity in [1usize, 16, 256, 2048] {
        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                runtime.block_on(async {
                    let queue = Arc::new(BoundedFrameQueue::new(StreamKind::Video, capacity));

                    let consumer = {
                        let queue = Arc::clone(&queue);
                        let handle = tokio::runtime::Handle::current();
                        tokio::task::spawn_blocking(move || {
                            let mut received = 0u64;
                            while let Ok(unit) = queue.blocking_pop(&handle) {
                                black_box(&unit);
                                received += 1;
                            }
                            received
                        })
                    };

                    let producer = {
                        let queue = Arc::clone(&queue);
                        let handle = tokio::runtime::Handle::current();
                        tokio::task::spawn_blocking(move || {
                            for index in 0..UNITS {
                                queue.blocking_push(&handle, unit(index)).unwrap();
                            }
                            queue.close();
                        })
                    };

                    producer.await.unwrap();
                    assert_eq!(consumer.await.unwrap(), UNITS);
                })
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_queue_handoff);
criterion_main!(benches);
