//! Capability view over a pool's internals, handed to admission strategies.

use super::error::Rejected;
use super::task::{Task, TaskId};
use crate::infra::queue::BlockingQueue;

/// Live view of a pool plus the operations an admission strategy may perform.
///
/// Every accessor reads current state; nothing is cached between calls.
pub trait PoolContext: Send + Sync {
    /// Workers currently alive.
    fn worker_count(&self) -> usize;

    /// Workers kept alive while idle.
    fn core_pool_size(&self) -> usize;

    /// Upper bound on workers.
    fn maximum_pool_size(&self) -> usize;

    /// The pool's work queue.
    fn queue(&self) -> &dyn BlockingQueue<Task>;

    /// Whether the pool still accepts new tasks.
    fn is_running(&self) -> bool;

    /// Start a worker that runs `first_task` before polling the queue.
    ///
    /// `core` bounds the worker count by `core_pool_size`, otherwise by
    /// `maximum_pool_size`.
    ///
    /// # Errors
    ///
    /// Hands the task back if the bound is reached, the pool is shutting down
    /// or the thread could not be spawned.
    fn add_worker(&self, first_task: Task, core: bool) -> Result<(), Task>;

    /// Start a worker with no first task. Returns false if none was started.
    fn add_idle_worker(&self, core: bool) -> bool;

    /// Remove a queued task by id.
    fn remove_task(&self, id: TaskId) -> Option<Task>;

    /// Record a rejection and build the signal carrying `task` back.
    fn reject_task(&self, task: Task) -> Rejected;
}
