//! Extended worker pool with a pluggable admission strategy.
//!
//! `ExtendedPool` runs tasks on dedicated OS threads pulled from a shared
//! [`BlockingQueue`]. The decision whether a submitted task starts a new worker,
//! waits in the queue or is rejected is delegated to an [`AdmissionStrategy`],
//! which sees the pool only through [`PoolContext`].
//!
//! # Worker lifecycle
//!
//! - Core workers (while `worker_count <= core_pool_size`) wait on the queue in
//!   short ticks so they observe shutdown without interruption. While running they
//!   only `take`, which never reaches a shared overflow tier.
//! - Workers above the core size poll in the same ticks and retire once idle
//!   for `keep_alive`, unless they are the last worker and the queue is not empty.
//! - A panicking task is caught and counted; the worker keeps running.
//! - Shutdown lets queued work drain; `shutdown_now` hands queued tasks back.
//!
//! The run state only moves forward: RUNNING, SHUTDOWN, STOP, TERMINATED.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::context::PoolContext;
use super::error::{panic_message, ConfigError, RejectReason, Rejected};
use super::executor::Executor;
use super::strategy::AdmissionStrategy;
use super::task::{Task, TaskId};
use super::thread_factory::{NamedThreadFactory, ThreadFactory};
use crate::config::PoolConfig;
use crate::infra::queue::BlockingQueue;

const RUNNING: u8 = 0;
const SHUTDOWN: u8 = 1;
const STOP: u8 = 2;
const TERMINATED: u8 = 3;

/// Wait slice for core workers blocked on an empty queue.
const IDLE_TICK: Duration = Duration::from_millis(50);

/// How long a dropped pool with non-daemon workers waits for them.
const DROP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Workers currently alive.
    pub worker_count: usize,
    /// Configured core size.
    pub core_pool_size: usize,
    /// Configured maximum size.
    pub max_pool_size: usize,
    /// Highest worker count ever reached.
    pub largest_pool_size: usize,
    /// Tasks currently executing.
    pub active_tasks: u64,
    /// Tasks waiting in the queue.
    pub queued_tasks: usize,
    /// Tasks accepted by `execute`.
    pub submitted_tasks: u64,
    /// Tasks that returned normally.
    pub completed_tasks: u64,
    /// Tasks that panicked.
    pub failed_tasks: u64,
    /// Tasks refused by the admission strategy.
    pub rejected_tasks: u64,
}

/// Lock-free counters backing [`PoolStats`].
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_tasks: AtomicU64,
    pub submitted_tasks: AtomicU64,
    pub completed_tasks: AtomicU64,
    pub failed_tasks: AtomicU64,
    pub rejected_tasks: AtomicU64,
}

impl PoolCounters {
    fn snapshot(&self) -> PoolStats {
        PoolStats {
            active_tasks: self.active_tasks.load(Ordering::Relaxed),
            submitted_tasks: self.submitted_tasks.load(Ordering::Relaxed),
            completed_tasks: self.completed_tasks.load(Ordering::Relaxed),
            failed_tasks: self.failed_tasks.load(Ordering::Relaxed),
            rejected_tasks: self.rejected_tasks.load(Ordering::Relaxed),
            ..PoolStats::default()
        }
    }
}

/// Worker bookkeeping guarded by the pool's main lock.
struct PoolState {
    workers: HashMap<u64, JoinHandle<()>>,
    worker_count: usize,
    next_worker_id: u64,
    largest_pool_size: usize,
}

/// Shared pool internals. Worker threads hold an `Arc` to this.
struct PoolCore {
    name: String,
    core_pool_size: usize,
    max_pool_size: usize,
    keep_alive: Duration,
    queue: Arc<dyn BlockingQueue<Task>>,
    thread_factory: Arc<dyn ThreadFactory>,
    state: Mutex<PoolState>,
    /// Mirror of `state.worker_count` for lock-free reads; written under `state`.
    worker_count: AtomicUsize,
    run_state: AtomicU8,
    termination: Condvar,
    counters: PoolCounters,
}

impl PoolCore {
    fn run_state(&self) -> u8 {
        self.run_state.load(Ordering::SeqCst)
    }

    fn advance_run_state(&self, target: u8) {
        let _state = self.state.lock();
        self.run_state.fetch_max(target, Ordering::SeqCst);
    }

    fn set_worker_count(&self, state: &mut PoolState, count: usize) {
        state.worker_count = count;
        self.worker_count.store(count, Ordering::SeqCst);
    }

    /// Start a worker. On success the first task (if any) is moved into the
    /// worker; on failure it is left in `first_task`.
    fn spawn_worker(self: &Arc<Self>, first_task: &mut Option<Task>, core: bool) -> bool {
        let accepts = |rs: u8, first: &Option<Task>| {
            rs == RUNNING || (rs == SHUTDOWN && first.is_none() && !self.queue.is_empty())
        };
        if !accepts(self.run_state(), first_task) {
            return false;
        }

        let mut state = self.state.lock();
        if !accepts(self.run_state(), first_task) {
            return false;
        }
        let bound = if core { self.core_pool_size } else { self.max_pool_size };
        if state.worker_count >= bound {
            return false;
        }

        let worker_id = state.next_worker_id;
        state.next_worker_id += 1;
        let count = state.worker_count + 1;
        self.set_worker_count(&mut state, count);

        let slot = Arc::new(Mutex::new(first_task.take()));
        let handoff = Arc::clone(&slot);
        let pool = Arc::clone(self);
        match self
            .thread_factory
            .spawn(Box::new(move || pool.run_worker(worker_id, &handoff)))
        {
            Ok(handle) => {
                state.largest_pool_size = state.largest_pool_size.max(count);
                state.workers.insert(worker_id, handle);
                debug!(pool = %self.name, worker_id, core, worker_count = count, "worker started");
                true
            }
            Err(e) => {
                self.set_worker_count(&mut state, count - 1);
                drop(state);
                warn!(pool = %self.name, error = %e, "failed to spawn worker thread");
                *first_task = slot.lock().take();
                false
            }
        }
    }

    fn run_worker(self: Arc<Self>, worker_id: u64, first: &Mutex<Option<Task>>) {
        let mut next = first.lock().take();
        loop {
            let task = match next.take() {
                Some(task) => task,
                None => match self.get_task() {
                    Some(task) => task,
                    None => break,
                },
            };
            self.run_task(worker_id, task);
        }
        self.process_worker_exit(worker_id);
    }

    fn run_task(&self, worker_id: u64, task: Task) {
        let task_id = task.id();
        self.counters.active_tasks.fetch_add(1, Ordering::Relaxed);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| task.run()));
        self.counters.active_tasks.fetch_sub(1, Ordering::Relaxed);
        match outcome {
            Ok(()) => {
                self.counters.completed_tasks.fetch_add(1, Ordering::Relaxed);
            }
            Err(payload) => {
                self.counters.failed_tasks.fetch_add(1, Ordering::Relaxed);
                warn!(
                    pool = %self.name,
                    worker_id,
                    task_id,
                    error = %panic_message(payload.as_ref()),
                    "task panicked"
                );
            }
        }
    }

    /// Next task for a worker, or `None` once the worker has been retired and
    /// the worker count already decremented.
    fn get_task(&self) -> Option<Task> {
        let mut idle_since: Option<Instant> = None;
        loop {
            let rs = self.run_state();
            if rs >= STOP || (rs >= SHUTDOWN && self.queue.is_empty()) {
                self.decrement_worker_count();
                return None;
            }

            let wc = self.worker_count.load(Ordering::SeqCst);
            let timed = wc > self.core_pool_size;
            let timed_out = timed && idle_since.is_some_and(|since| since.elapsed() >= self.keep_alive);
            if (wc > self.max_pool_size || timed_out) && (wc > 1 || self.queue.is_empty()) {
                if self.try_decrement_worker_count(wc) {
                    return None;
                }
                continue;
            }

            // timed workers wait out keep_alive in ticks so shutdown is seen promptly
            let polled = if timed {
                let waited = idle_since.get_or_insert_with(Instant::now).elapsed();
                self.queue
                    .poll_timeout(self.keep_alive.saturating_sub(waited).min(IDLE_TICK))
            } else if rs >= SHUTDOWN {
                self.queue.poll_timeout(IDLE_TICK)
            } else {
                // core workers take, so a shared overflow tier is left to timed workers
                self.queue.take_timeout(IDLE_TICK)
            };
            if polled.is_some() {
                return polled;
            }
        }
    }

    fn try_decrement_worker_count(&self, expected: usize) -> bool {
        let mut state = self.state.lock();
        if state.worker_count != expected {
            return false;
        }
        self.set_worker_count(&mut state, expected - 1);
        true
    }

    fn decrement_worker_count(&self) {
        let mut state = self.state.lock();
        let count = state.worker_count.saturating_sub(1);
        self.set_worker_count(&mut state, count);
    }

    fn process_worker_exit(self: &Arc<Self>, worker_id: u64) {
        let remaining = {
            let mut state = self.state.lock();
            state.workers.remove(&worker_id);
            state.worker_count
        };
        debug!(pool = %self.name, worker_id, worker_count = remaining, "worker exited");
        self.try_terminate();

        if self.run_state() < STOP {
            let mut min = self.core_pool_size;
            if min == 0 && !self.queue.is_empty() {
                min = 1;
            }
            if self.worker_count.load(Ordering::SeqCst) < min {
                self.spawn_worker(&mut None, false);
            }
        }
    }

    fn try_terminate(&self) {
        let rs = self.run_state();
        if rs == RUNNING || rs == TERMINATED || (rs == SHUTDOWN && !self.queue.is_empty()) {
            return;
        }
        let state = self.state.lock();
        if state.worker_count != 0 || self.run_state() == TERMINATED {
            return;
        }
        self.run_state.store(TERMINATED, Ordering::SeqCst);
        self.termination.notify_all();
        drop(state);
        info!(pool = %self.name, "pool terminated");
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.state.lock();
        while self.run_state() != TERMINATED {
            match deadline {
                Some(deadline) => {
                    if self.termination.wait_until(&mut state, deadline).timed_out() {
                        return self.run_state() == TERMINATED;
                    }
                }
                None => self.termination.wait(&mut state),
            }
        }
        true
    }

    fn drain_queue(&self) -> Vec<Task> {
        let mut drained = Vec::new();
        if self.queue.drain_to(&mut drained, usize::MAX).is_err() {
            while let Some(task) = self.queue.try_take() {
                drained.push(task);
            }
        }
        drained
    }
}

impl PoolContext for Arc<PoolCore> {
    fn worker_count(&self) -> usize {
        self.worker_count.load(Ordering::SeqCst)
    }

    fn core_pool_size(&self) -> usize {
        self.core_pool_size
    }

    fn maximum_pool_size(&self) -> usize {
        self.max_pool_size
    }

    fn queue(&self) -> &dyn BlockingQueue<Task> {
        self.queue.as_ref()
    }

    fn is_running(&self) -> bool {
        self.run_state() == RUNNING
    }

    fn add_worker(&self, first_task: Task, core: bool) -> Result<(), Task> {
        let mut first = Some(first_task);
        if self.spawn_worker(&mut first, core) {
            return Ok(());
        }
        first.map_or(Ok(()), Err)
    }

    fn add_idle_worker(&self, core: bool) -> bool {
        self.spawn_worker(&mut None, core)
    }

    fn remove_task(&self, id: TaskId) -> Option<Task> {
        let removed = self.queue.remove_where(&|t: &Task| t.id() == id);
        self.try_terminate();
        removed
    }

    fn reject_task(&self, task: Task) -> Rejected {
        self.counters.rejected_tasks.fetch_add(1, Ordering::Relaxed);
        let reason = if self.is_running() {
            RejectReason::Saturated
        } else {
            RejectReason::Shutdown
        };
        debug!(pool = %self.name, task_id = task.id(), %reason, "task rejected");
        Rejected::new(reason, task)
    }
}

/// Worker pool whose admission policy is an injected [`AdmissionStrategy`].
///
/// # Example
///
/// ```rust,ignore
/// use adaptive_pool::config::PoolConfig;
/// use adaptive_pool::core::{Executor, ExtendedPool, TaskMeta};
///
/// let pool = ExtendedPool::new(&PoolConfig::new(2, 8))?;
/// let handle = pool.submit(TaskMeta::new("io"), || 21 * 2)?;
/// assert_eq!(handle.join()?, 42);
/// ```
pub struct ExtendedPool {
    core: Arc<PoolCore>,
    strategy: Arc<dyn AdmissionStrategy>,
}

impl ExtendedPool {
    /// Build a pool from `config`, with the queue, strategy and thread factory
    /// it describes.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidArgument` if the configuration is invalid.
    pub fn new(config: &PoolConfig) -> Result<Self, ConfigError> {
        Self::builder(config).build()
    }

    /// Start a builder that can override the queue, strategy or thread factory.
    #[must_use]
    pub fn builder(config: &PoolConfig) -> ExtendedPoolBuilder {
        ExtendedPoolBuilder {
            config: config.clone(),
            name: None,
            queue: None,
            strategy: None,
            thread_factory: None,
        }
    }

    /// Pool name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Active admission strategy.
    #[must_use]
    pub fn strategy(&self) -> &dyn AdmissionStrategy {
        self.strategy.as_ref()
    }

    /// Workers currently alive.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.core.worker_count()
    }

    /// The pool's work queue.
    #[must_use]
    pub fn queue(&self) -> &Arc<dyn BlockingQueue<Task>> {
        &self.core.queue
    }

    /// Current pool statistics.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let mut stats = self.core.counters.snapshot();
        {
            let state = self.core.state.lock();
            stats.worker_count = state.worker_count;
            stats.largest_pool_size = state.largest_pool_size;
        }
        stats.core_pool_size = self.core.core_pool_size;
        stats.max_pool_size = self.core.max_pool_size;
        stats.queued_tasks = self.core.queue.len();
        stats
    }
}

impl Executor for ExtendedPool {
    fn execute(&self, task: Task) -> Result<(), Rejected> {
        let task_id = task.id();
        self.strategy.add_worker(task, &self.core)?;
        self.core.counters.submitted_tasks.fetch_add(1, Ordering::Relaxed);
        debug!(pool = %self.core.name, task_id, "task accepted");
        Ok(())
    }

    fn queue_len(&self) -> usize {
        self.core.queue.len()
    }

    fn shutdown(&self) {
        if self.core.run_state() >= SHUTDOWN {
            return;
        }
        self.core.advance_run_state(SHUTDOWN);
        info!(pool = %self.core.name, "pool shutting down");
        self.core.try_terminate();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.core.advance_run_state(STOP);
        let drained = self.core.drain_queue();
        info!(pool = %self.core.name, drained = drained.len(), "pool stopping");
        self.core.try_terminate();
        drained
    }

    fn is_shutdown(&self) -> bool {
        self.core.run_state() >= SHUTDOWN
    }

    fn is_terminated(&self) -> bool {
        self.core.run_state() == TERMINATED
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        self.core.await_termination(timeout)
    }
}

impl Drop for ExtendedPool {
    fn drop(&mut self) {
        self.shutdown();
        if !self.core.thread_factory.is_daemon() && !self.core.await_termination(DROP_JOIN_TIMEOUT) {
            warn!(pool = %self.core.name, "pool dropped with workers still running - detaching");
        }
    }
}

impl std::fmt::Debug for ExtendedPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedPool")
            .field("name", &self.core.name)
            .field("strategy", &self.strategy.name())
            .field("stats", &self.stats())
            .finish()
    }
}

/// Builder for [`ExtendedPool`] overriding pieces derived from [`PoolConfig`].
pub struct ExtendedPoolBuilder {
    config: PoolConfig,
    name: Option<String>,
    queue: Option<Arc<dyn BlockingQueue<Task>>>,
    strategy: Option<Arc<dyn AdmissionStrategy>>,
    thread_factory: Option<Arc<dyn ThreadFactory>>,
}

impl ExtendedPoolBuilder {
    /// Name used in logs. Defaults to the thread name prefix.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use `queue` instead of the one described by the config.
    #[must_use]
    pub fn with_queue(mut self, queue: Arc<dyn BlockingQueue<Task>>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Use `strategy` instead of the configured one.
    #[must_use]
    pub fn with_strategy(mut self, strategy: Arc<dyn AdmissionStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Use `factory` to create worker threads.
    #[must_use]
    pub fn with_thread_factory(mut self, factory: Arc<dyn ThreadFactory>) -> Self {
        self.thread_factory = Some(factory);
        self
    }

    /// Validate the config and build the pool. No worker is started until the
    /// first task arrives.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidArgument` if the configuration is invalid.
    pub fn build(self) -> Result<ExtendedPool, ConfigError> {
        let config = self.config;
        config.validate().map_err(ConfigError::InvalidArgument)?;

        let queue = self.queue.unwrap_or_else(|| config.build_queue());
        let strategy = self
            .strategy
            .unwrap_or_else(|| config.strategy.build());
        let thread_factory = self.thread_factory.unwrap_or_else(|| {
            Arc::new(
                NamedThreadFactory::new(config.thread_name_prefix.clone())
                    .with_daemon(config.daemon)
                    .with_stack_size(config.thread_stack_size),
            )
        });
        let name = self
            .name
            .unwrap_or_else(|| config.thread_name_prefix.trim_end_matches('-').to_string());

        info!(
            pool = %name,
            core_pool_size = config.core_pool_size,
            max_pool_size = config.max_pool_size,
            keep_alive_ms = config.keep_alive_ms,
            strategy = strategy.name(),
            "pool initialized"
        );

        let core = Arc::new(PoolCore {
            name,
            core_pool_size: config.core_pool_size,
            max_pool_size: config.max_pool_size,
            keep_alive: Duration::from_millis(config.keep_alive_ms),
            queue,
            thread_factory,
            state: Mutex::new(PoolState {
                workers: HashMap::new(),
                worker_count: 0,
                next_worker_id: 0,
                largest_pool_size: 0,
            }),
            worker_count: AtomicUsize::new(0),
            run_state: AtomicU8::new(RUNNING),
            termination: Condvar::new(),
            counters: PoolCounters::default(),
        });
        Ok(ExtendedPool { core, strategy })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{OriginalStrategy, TaskError, TaskMeta};
    use crate::infra::queue::LinkedBlockingQueue;
    use std::sync::atomic::AtomicBool;
    use std::thread;

    fn config(core: usize, max: usize) -> PoolConfig {
        PoolConfig::new(core, max)
            .with_keep_alive_ms(50)
            .with_thread_name_prefix("wp-test-")
    }

    #[test]
    fn test_submit_and_join() {
        let pool = ExtendedPool::new(&config(2, 4)).unwrap();
        let handle = pool.submit(TaskMeta::new("calc"), || 6 * 7).unwrap();
        assert_eq!(handle.join_timeout(Duration::from_secs(5)), Ok(42));
        let stats = pool.stats();
        assert_eq!(stats.submitted_tasks, 1);
        assert_eq!(stats.largest_pool_size, 1);
        pool.shutdown();
        assert!(pool.await_termination(Duration::from_secs(5)));
        assert_eq!(pool.stats().completed_tasks, 1);
    }

    #[test]
    fn test_worker_survives_panicking_task() {
        let pool = ExtendedPool::new(&config(1, 1)).unwrap();
        let bad = pool.submit::<_, ()>(TaskMeta::default(), || panic!("kaput")).unwrap();
        assert_eq!(
            bad.join_timeout(Duration::from_secs(5)),
            Err(TaskError::Panicked("kaput".into()))
        );
        let good = pool.submit(TaskMeta::default(), || "ok").unwrap();
        assert_eq!(good.join_timeout(Duration::from_secs(5)), Ok("ok"));
        pool.shutdown();
        assert!(pool.await_termination(Duration::from_secs(5)));
        let stats = pool.stats();
        assert_eq!(stats.failed_tasks, 1);
        assert_eq!(stats.completed_tasks, 1);
    }

    #[test]
    fn test_rejected_after_shutdown() {
        let pool = ExtendedPool::new(&config(1, 1)).unwrap();
        pool.shutdown();
        assert!(pool.is_shutdown());
        let err = pool.execute(Task::from_fn(|| {})).unwrap_err();
        assert_eq!(err.reason(), RejectReason::Shutdown);
        assert!(pool.is_terminated());
    }

    #[test]
    fn test_shutdown_now_returns_queued() {
        let gate = Arc::new(AtomicBool::new(false));
        let pool = ExtendedPool::builder(&config(1, 1))
            .with_queue(Arc::new(LinkedBlockingQueue::bounded(10)))
            .with_strategy(Arc::new(OriginalStrategy))
            .build()
            .unwrap();
        let g = Arc::clone(&gate);
        pool.execute(Task::from_fn(move || {
            while !g.load(Ordering::SeqCst) {
                thread::sleep(Duration::from_millis(5));
            }
        }))
        .unwrap();
        let queued = pool.submit(TaskMeta::default(), || 1).unwrap();
        pool.execute(Task::from_fn(|| {})).unwrap();

        let drained = pool.shutdown_now();
        assert_eq!(drained.len(), 2);
        drop(drained);
        assert_eq!(queued.join(), Err(TaskError::Abandoned));

        gate.store(true, Ordering::SeqCst);
        assert!(pool.await_termination(Duration::from_secs(5)));
    }

    #[test]
    fn test_non_core_workers_retire_after_keep_alive() {
        let pool = ExtendedPool::new(&config(1, 3)).unwrap();
        let handles: Vec<_> = (0..6)
            .map(|_| {
                pool.submit(TaskMeta::default(), || thread::sleep(Duration::from_millis(50)))
                    .unwrap()
            })
            .collect();
        for h in handles {
            h.join_timeout(Duration::from_secs(5)).unwrap();
        }
        assert!(pool.stats().largest_pool_size > 1);
        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.worker_count() > 1 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(20));
        }
        assert_eq!(pool.worker_count(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(ExtendedPool::new(&PoolConfig::new(4, 2)).is_err());
    }
}
