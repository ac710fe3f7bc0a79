//! Executor abstraction shared by pools, dual executors and the adaptive service.

use std::time::Duration;

use super::error::Rejected;
use super::handle::TaskHandle;
use super::task::{Task, TaskMeta};

/// Something that runs [`Task`]s.
///
/// `execute` either accepts the task or hands it back inside [`Rejected`].
/// Implementations must never drop a task silently.
pub trait Executor: Send + Sync {
    /// Offer a task for execution.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] carrying the task when it cannot be accepted.
    fn execute(&self, task: Task) -> Result<(), Rejected>;

    /// Wrap `f` into a task, execute it and return a handle to its result.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] when the task cannot be accepted.
    fn submit<F, R>(&self, meta: TaskMeta, f: F) -> Result<TaskHandle<R>, Rejected>
    where
        Self: Sized,
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        submit(self, meta, f)
    }

    /// Number of queued (not yet running) tasks.
    fn queue_len(&self) -> usize;

    /// Stop accepting tasks; queued tasks still run.
    fn shutdown(&self);

    /// Stop accepting tasks and return the ones still queued.
    fn shutdown_now(&self) -> Vec<Task>;

    /// Whether `shutdown` or `shutdown_now` has been called.
    fn is_shutdown(&self) -> bool;

    /// Whether every worker has exited after shutdown.
    fn is_terminated(&self) -> bool;

    /// Block until terminated or `timeout` elapses. Returns true if terminated.
    fn await_termination(&self, timeout: Duration) -> bool;
}

/// [`Executor::submit`] for trait objects.
///
/// # Errors
///
/// Returns [`Rejected`] when the task cannot be accepted.
pub fn submit<E, F, R>(executor: &E, meta: TaskMeta, f: F) -> Result<TaskHandle<R>, Rejected>
where
    E: Executor + ?Sized,
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (task, handle) = TaskHandle::bind(meta, f);
    executor.execute(task)?;
    Ok(handle)
}
