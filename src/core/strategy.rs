//! Pluggable admission strategies: start a worker, queue, or reject.

use std::fmt;

use tracing::debug;

use super::context::PoolContext;
use super::error::Rejected;
use super::task::Task;

/// Decides how a pool admits a submitted task.
pub trait AdmissionStrategy: Send + Sync + fmt::Debug {
    /// Start a worker for `task`, queue it, or reject it, using only `ctx`.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected`] carrying the task when it is refused.
    fn add_worker(&self, task: Task, ctx: &dyn PoolContext) -> Result<(), Rejected>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Classic pool admission: fill core workers, then queue, then grow to the
/// maximum, then reject.
#[derive(Debug, Clone, Copy, Default)]
pub struct OriginalStrategy;

/// Eager admission: fill core workers, then grow towards the maximum while
/// there are more queued tasks than workers, and only then queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct EagerStrategy;

impl AdmissionStrategy for OriginalStrategy {
    fn add_worker(&self, task: Task, ctx: &dyn PoolContext) -> Result<(), Rejected> {
        let task = match start_core_worker(task, ctx) {
            Ok(()) => return Ok(()),
            Err(task) => task,
        };
        enqueue_or_grow(task, ctx)
    }

    fn name(&self) -> &'static str {
        "original"
    }
}

impl AdmissionStrategy for EagerStrategy {
    fn add_worker(&self, mut task: Task, ctx: &dyn PoolContext) -> Result<(), Rejected> {
        if ctx.worker_count() < ctx.core_pool_size() {
            // a lost race for a core slot goes straight to the queue
            return ctx
                .add_worker(task, true)
                .or_else(|task| enqueue_or_grow(task, ctx));
        }
        let wc = ctx.worker_count();
        if wc < ctx.maximum_pool_size() && wc < ctx.queue().len() {
            match ctx.add_worker(task, false) {
                Ok(()) => return Ok(()),
                Err(back) => task = back,
            }
        }
        enqueue_or_grow(task, ctx)
    }

    fn name(&self) -> &'static str {
        "eager"
    }
}

fn start_core_worker(task: Task, ctx: &dyn PoolContext) -> Result<(), Task> {
    if ctx.worker_count() < ctx.core_pool_size() {
        ctx.add_worker(task, true)
    } else {
        Err(task)
    }
}

/// Shared tail of both strategies: enqueue and re-check, else grow a non-core
/// worker, else reject.
fn enqueue_or_grow(task: Task, ctx: &dyn PoolContext) -> Result<(), Rejected> {
    let id = task.id();
    let task = if ctx.is_running() {
        match ctx.queue().offer(task) {
            Ok(()) => {
                if !ctx.is_running() {
                    if let Some(task) = ctx.remove_task(id) {
                        debug!(task_id = id, "pool stopped while queueing, task withdrawn");
                        return Err(ctx.reject_task(task));
                    }
                }
                if ctx.worker_count() == 0 {
                    ctx.add_idle_worker(false);
                }
                return Ok(());
            }
            Err(task) => task,
        }
    } else {
        task
    };
    ctx.add_worker(task, false).map_err(|task| ctx.reject_task(task))
}
