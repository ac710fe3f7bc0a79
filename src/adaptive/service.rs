//! Category-routed executor service with adaptive admission.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;

use super::listener::{ListenableTask, TaskListener};
use super::policy::{CapacityPolicy, ExecutorLoad, StaticPolicy};
use super::selector::ExecutorSelector;
use super::stats::CategoryStats;
use crate::core::{Executor, RejectReason, Rejected, Task, TaskMeta};

/// Front door for categorised work.
///
/// `execute` validates the task's metadata, selects an executor for its
/// category, asks the [`CapacityPolicy`] whether the category may commit one
/// more task, then runs it wrapped with the statistics listener and any
/// extra listeners.
pub struct AdaptiveExecutorService {
    selector: Arc<dyn ExecutorSelector>,
    stats: Arc<CategoryStats>,
    policy: Arc<dyn CapacityPolicy>,
    listeners: Vec<Arc<dyn TaskListener>>,
}

impl AdaptiveExecutorService {
    /// Service over `selector`, recording into `stats`, with [`StaticPolicy`].
    pub fn new(selector: Arc<dyn ExecutorSelector>, stats: Arc<CategoryStats>) -> Self {
        Self {
            selector,
            stats,
            policy: Arc::new(StaticPolicy::default()),
            listeners: Vec::new(),
        }
    }

    /// Replace the capacity policy.
    #[must_use]
    pub fn with_policy(mut self, policy: Arc<dyn CapacityPolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Add a listener that runs after the statistics listener.
    #[must_use]
    pub fn with_listener(mut self, listener: Arc<dyn TaskListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Per-category statistics.
    pub fn stats(&self) -> &Arc<CategoryStats> {
        &self.stats
    }

    /// Active capacity policy.
    pub fn policy(&self) -> &dyn CapacityPolicy {
        self.policy.as_ref()
    }

    /// Executor selector.
    pub fn selector(&self) -> &Arc<dyn ExecutorSelector> {
        &self.selector
    }

    /// Queue size the policy considers safe for `meta`'s category.
    pub fn calculate_suitable_queue_size(&self, meta: &TaskMeta) -> usize {
        let snapshot = self.stats.snapshot(&meta.category);
        self.policy.suitable_queue_size(meta, snapshot.as_ref())
    }

    /// Whether a task with `meta` would currently be admitted.
    pub fn could_commit(&self, meta: &TaskMeta) -> bool {
        self.selector
            .select(meta)
            .is_some_and(|executor| self.admits(meta, executor.as_ref()))
    }

    fn admits(&self, meta: &TaskMeta, executor: &dyn Executor) -> bool {
        let snapshot = self.stats.snapshot(&meta.category);
        let load = ExecutorLoad {
            queued: executor.queue_len(),
        };
        self.policy.could_commit(meta, snapshot.as_ref(), &load)
    }
}

impl Executor for AdaptiveExecutorService {
    fn execute(&self, task: Task) -> Result<(), Rejected> {
        if let Err(e) = task.meta().validate() {
            debug!(task_id = task.id(), error = %e, "task rejected: invalid metadata");
            return Err(Rejected::new(RejectReason::InvalidTask, task));
        }
        let Some(executor) = self.selector.select(task.meta()) else {
            debug!(task_id = task.id(), category = %task.meta().category, "task rejected: no route");
            return Err(Rejected::new(RejectReason::NoRoute, task));
        };
        if !self.admits(task.meta(), executor.as_ref()) {
            debug!(
                task_id = task.id(),
                category = %task.meta().category,
                "task rejected: capacity policy declined"
            );
            return Err(Rejected::new(RejectReason::PolicyDeclined, task));
        }

        let mut listeners: Vec<Arc<dyn TaskListener>> = Vec::with_capacity(1 + self.listeners.len());
        listeners.push(Arc::clone(&self.stats) as Arc<dyn TaskListener>);
        listeners.extend(self.listeners.iter().cloned());
        executor.execute(ListenableTask::new(task, listeners).into())
    }

    fn queue_len(&self) -> usize {
        self.selector.executors().iter().map(|e| e.queue_len()).sum()
    }

    fn shutdown(&self) {
        for executor in self.selector.executors() {
            executor.shutdown();
        }
    }

    fn shutdown_now(&self) -> Vec<Task> {
        self.selector
            .executors()
            .iter()
            .flat_map(|e| e.shutdown_now())
            .collect()
    }

    fn is_shutdown(&self) -> bool {
        self.selector.executors().iter().all(|e| e.is_shutdown())
    }

    fn is_terminated(&self) -> bool {
        self.selector.executors().iter().all(|e| e.is_terminated())
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut all = true;
        for executor in self.selector.executors() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            all &= executor.await_termination(remaining);
        }
        all
    }
}

impl std::fmt::Debug for AdaptiveExecutorService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdaptiveExecutorService")
            .field("policy", &self.policy)
            .field("categories", &self.stats.categories())
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
