// crates/judge-core/benches/queue_bench.rs
//
// Two Criterion benchmark groups:
//   push_pop    — push/pop cost at increasing queue depths
//   interleaved — push and pop interleaved to approximate steady-state load

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use judge_core::queue::{PriorityQueue, QueuedTask};

fn seed_task(i: u64) -> QueuedTask {
    QueuedTask {
        task_id: format!("task-{i}"),
        priority: (i % 10) as i64,
        created_at: i,
    }
}

fn push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("push_pop");

    for size in [100usize, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("push_{size}"), |b| {
            b.iter(|| {
                let mut queue = PriorityQueue::new();
                for i in 0..size as u64 {
                    queue.push(black_box(seed_task(i)));
                }
                black_box(queue.size())
            })
        });

        group.bench_function(format!("pop_{size}"), |b| {
            b.iter_batched(
                || {
                    let mut queue = PriorityQueue::new();
                    for i in 0..size as u64 {
                        queue.push(seed_task(i));
                    }
                    queue
                },
                |mut queue| {
                    while let Some(task) = queue.pop() {
                        black_box(task);
                    }
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    group.finish();
}

fn interleaved(c: &mut Criterion) {
    let mut group = c.benchmark_group("interleaved");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_then_pop_pairs", |b| {
        b.iter(|| {
            let mut queue = PriorityQueue::new();
            for i in 0..1_000u64 {
                queue.push(seed_task(i));
                if i % 2 == 0 {
                    black_box(queue.pop());
                }
            }
            while let Some(task) = queue.pop() {
                black_box(task);
            }
        })
    });
    group.finish();
}

criterion_group!(benches_push_pop, push_pop);
criterion_group!(benches_interleaved, interleaved);
criterion_main!(benches_push_pop, benches_interleaved);
