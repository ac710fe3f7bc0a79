//! Integration tests comparing admission strategies on a live pool
//!
//! A pool with core 1 / max 10 receives 20 long-running tasks:
//! - Eager admission grows to the maximum while tasks are queued
//! - Original admission keeps one worker and queues the rest

use adaptive_pool::config::{PoolConfig, QueueConfig, StrategyKind};
use adaptive_pool::core::{Executor, ExtendedPool, TaskHandle, TaskMeta};
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn pool(strategy: StrategyKind) -> ExtendedPool {
    let cfg = PoolConfig::new(1, 10)
        .with_strategy(strategy)
        .with_queue(QueueConfig::unbounded())
        .with_thread_name_prefix(format!("{strategy:?}-").to_lowercase());
    ExtendedPool::new(&cfg).unwrap()
}

/// Submit `n` tasks that block until the returned guard is dropped.
fn submit_blocked(pool: &ExtendedPool, n: usize) -> (MutexGuard<'static, ()>, Vec<TaskHandle<()>>) {
    let gate: &'static Mutex<()> = Box::leak(Box::new(Mutex::new(())));
    let held = gate.lock();
    let handles = (0..n)
        .map(|_| {
            pool.submit(TaskMeta::new("slow"), move || drop(gate.lock()))
                .unwrap()
        })
        .collect();
    (held, handles)
}

fn join_all(handles: Vec<TaskHandle<()>>) {
    for h in handles {
        assert_eq!(h.join_timeout(Duration::from_secs(10)), Ok(()));
    }
}

// ============================================================================
// STRATEGY BEHAVIOUR
// ============================================================================

#[test]
fn test_eager_grows_to_max_workers() {
    let pool = pool(StrategyKind::Eager);
    let (held, handles) = submit_blocked(&pool, 20);

    assert_eq!(pool.worker_count(), 10);
    assert_eq!(pool.queue().len(), 10);

    drop(held);
    join_all(handles);
    assert_eq!(pool.stats().largest_pool_size, 10);
}

#[test]
fn test_original_queues_before_growing() {
    let pool = pool(StrategyKind::Original);
    let (held, handles) = submit_blocked(&pool, 20);

    assert_eq!(pool.worker_count(), 1);
    assert_eq!(pool.queue().len(), 19);

    drop(held);
    join_all(handles);
    assert_eq!(pool.stats().largest_pool_size, 1);
}

#[test]
fn test_original_grows_once_queue_is_full() {
    let cfg = PoolConfig::new(1, 3)
        .with_strategy(StrategyKind::Original)
        .with_queue(QueueConfig::bounded(2).with_prefer_higher_throughput(false));
    let pool = ExtendedPool::new(&cfg).unwrap();
    let (held, handles) = submit_blocked(&pool, 5);

    assert_eq!(pool.worker_count(), 3);
    assert_eq!(pool.queue().len(), 2);

    let rejected = pool.submit(TaskMeta::new("slow"), || ()).unwrap_err();
    assert_eq!(rejected.reason(), adaptive_pool::core::RejectReason::Saturated);

    drop(held);
    join_all(handles);
}
