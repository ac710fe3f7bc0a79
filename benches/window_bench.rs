//! Benchmarks for the statistics window, queues and pools.
//!
//! Benchmarks cover:
//! - LeapArray bucket lookup and rotation
//! - Latency aggregation across buckets
//! - Queue offer/poll throughput per backend
//! - Pool submit-to-completion under both admission strategies

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use adaptive_pool::config::{IntervalUnit, PoolConfig, QueueConfig, StrategyKind, WindowConfig};
use adaptive_pool::core::{Executor, ExtendedPool, TaskMeta};
use adaptive_pool::infra::queue::{BlockingQueue, ChannelQueue, DualQueue, LinkedBlockingQueue};
use adaptive_pool::stats::AvgStatsWindow;

// ============================================================================
// Window Benchmarks
// ============================================================================

fn window_config() -> WindowConfig {
    WindowConfig::new(10, 1, IntervalUnit::Seconds).expect("valid window")
}

fn bench_window_record_same_bucket(c: &mut Criterion) {
    let w = AvgStatsWindow::new("bench", &window_config());
    c.bench_function("window_record_same_bucket", |b| {
        b.iter(|| w.record_at(black_box(1_000_050), black_box(12)));
    });
}

fn bench_window_record_rotating(c: &mut Criterion) {
    let w = AvgStatsWindow::new("bench", &window_config());
    let mut t = 1_000_000_u64;
    c.bench_function("window_record_rotating", |b| {
        b.iter(|| {
            // 100 ms buckets: every call lands in a fresh window
            t += 100;
            w.record_at(black_box(t), 5);
        });
    });
}

fn bench_window_record_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("window_record_contended");

    for threads in [2_u64, 4, 8] {
        group.throughput(Throughput::Elements(threads * 1_000));
        group.bench_with_input(BenchmarkId::from_parameter(threads), &threads, |b, &threads| {
            b.iter(|| {
                let w = Arc::new(AvgStatsWindow::new("bench", &window_config()));
                let workers: Vec<_> = (0..threads)
                    .map(|_| {
                        let w = Arc::clone(&w);
                        thread::spawn(move || {
                            for i in 0..1_000_u64 {
                                w.record_at(1_000_000 + i, 3);
                            }
                        })
                    })
                    .collect();
                for worker in workers {
                    worker.join().expect("bench worker panicked");
                }
                black_box(w.calculate_stats_result_at(1_001_000));
            });
        });
    }
    group.finish();
}

fn bench_window_aggregate(c: &mut Criterion) {
    let w = AvgStatsWindow::new("bench", &window_config());
    for i in 0..10_u64 {
        w.record_at(1_000_000 + i * 100, i);
    }
    c.bench_function("window_aggregate", |b| {
        b.iter(|| black_box(w.calculate_stats_result_at(black_box(1_000_950))));
    });
}

// ============================================================================
// Queue Benchmarks
// ============================================================================

fn offer_poll(q: &dyn BlockingQueue<u64>, size: u64) {
    for i in 0..size {
        let _ = q.offer(i);
    }
    while let Some(v) = q.poll() {
        black_box(v);
    }
}

fn bench_queue_offer_poll(c: &mut Criterion) {
    let mut group = c.benchmark_group("queue_offer_poll");

    for size in [100_u64, 1_000, 10_000] {
        group.throughput(Throughput::Elements(size));
        let cap = usize::try_from(size).expect("fits usize");
        group.bench_with_input(BenchmarkId::new("linked", size), &size, |b, &size| {
            let q = LinkedBlockingQueue::bounded(cap);
            b.iter(|| offer_poll(&q, size));
        });
        group.bench_with_input(BenchmarkId::new("channel", size), &size, |b, &size| {
            let q = ChannelQueue::bounded(cap);
            b.iter(|| offer_poll(&q, size));
        });
        group.bench_with_input(BenchmarkId::new("dual", size), &size, |b, &size| {
            let q = DualQueue::new(
                Arc::new(ChannelQueue::bounded(cap / 2)),
                Arc::new(LinkedBlockingQueue::unbounded()),
            );
            b.iter(|| offer_poll(&q, size));
        });
    }
    group.finish();
}

// ============================================================================
// Pool Benchmarks
// ============================================================================

fn bench_pool_submit_join(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_submit_join");

    for strategy in [StrategyKind::Original, StrategyKind::Eager] {
        let cfg = PoolConfig::new(2, 8)
            .with_strategy(strategy)
            .with_queue(QueueConfig::unbounded())
            .with_thread_name_prefix("bench-");
        let pool = ExtendedPool::new(&cfg).expect("valid pool config");
        group.throughput(Throughput::Elements(256));
        group.bench_function(BenchmarkId::from_parameter(format!("{strategy:?}")), |b| {
            b.iter(|| {
                let handles: Vec<_> = (0..256_u64)
                    .map(|i| {
                        pool.submit(TaskMeta::new("bench"), move || i * 2)
                            .expect("unbounded queue accepts")
                    })
                    .collect();
                for h in handles {
                    black_box(h.join().expect("task completes"));
                }
            });
        });
    }
    group.finish();
}

criterion_group!(
    window_benches,
    bench_window_record_same_bucket,
    bench_window_record_rotating,
    bench_window_record_contended,
    bench_window_aggregate
);

criterion_group!(queue_benches, bench_queue_offer_poll);

criterion_group!(pool_benches, bench_pool_submit_join);

criterion_main!(window_benches, queue_benches, pool_benches);
