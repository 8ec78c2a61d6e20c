//! Commutator benchmark: Measure post/drain throughput of the prioritized queues.
//!
//! Target: < 200ns per post + pop on an uncontended queue

use std::sync::Arc;
use std::thread;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use drape::{Message, MessageQueue, Priority, ThreadId, ThreadsCommutator};

/// Cheap message without heap payload.
fn message(n: u32) -> Message {
    Message::SetTimeInBackground(f64::from(n))
}

fn post_then_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("post_then_drain");
    for count in [64_u32, 1024, 16_384] {
        group.throughput(Throughput::Elements(u64::from(count)));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let queue = MessageQueue::new();
            b.iter(|| {
                for n in 0..count {
                    let _ = queue.push(message(n), Priority::Normal);
                }
                while let Some(message) = queue.try_pop() {
                    black_box(message);
                }
            });
        });
    }
    group.finish();
}

fn mixed_priorities(c: &mut Criterion) {
    let queue = MessageQueue::new();
    c.bench_function("mixed_priorities_1024", |b| {
        b.iter(|| {
            for n in 0..1024_u32 {
                let priority = Priority::ALL[(n % 3) as usize];
                let _ = queue.push(message(n), priority);
            }
            while let Some(message) = queue.try_pop() {
                black_box(message);
            }
        });
    });
}

fn commutator_post(c: &mut Criterion) {
    let commutator = ThreadsCommutator::new();
    c.bench_function("commutator_post_1024", |b| {
        b.iter(|| {
            for n in 0..1024 {
                let _ = commutator.post(ThreadId::Render, message(n), Priority::High);
            }
            let queue = commutator.queue(ThreadId::Render);
            while let Some(message) = queue.try_pop() {
                black_box(message);
            }
        });
    });
}

fn contended_producers(c: &mut Criterion) {
    c.bench_function("four_producers_4096", |b| {
        b.iter(|| {
            let queue = Arc::new(MessageQueue::new());
            let producers: Vec<_> = (0..4)
                .map(|_| {
                    let queue = Arc::clone(&queue);
                    thread::spawn(move || {
                        for n in 0..1024 {
                            let _ = queue.push(message(n), Priority::Normal);
                        }
                    })
                })
                .collect();
            for producer in producers {
                let _ = producer.join();
            }
            let mut drained = 0;
            while queue.try_pop().is_some() {
                drained += 1;
            }
            black_box(drained)
        });
    });
}

criterion_group!(benches, post_then_drain, mixed_priorities, commutator_post, contended_producers);
criterion_main!(benches);
