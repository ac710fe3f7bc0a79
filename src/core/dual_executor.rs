//! Primary executor with a shared spare executor as overflow.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::error::Rejected;
use super::executor::Executor;
use super::task::Task;

/// Sends every task to `primary`; a task the primary rejects is resubmitted to
/// `spare` exactly once. The spare is typically shared by many dual executors.
#[derive(Clone)]
pub struct DualExecutor {
    primary: Arc<dyn Executor>,
    spare: Arc<dyn Executor>,
}

impl DualExecutor {
    /// Compose `primary` with the fallback `spare`.
    pub fn new(primary: Arc<dyn Executor>, spare: Arc<dyn Executor>) -> Self {
        Self { primary, spare }
    }

    /// The primary executor.
    #[must_use]
    pub fn primary(&self) -> &Arc<dyn Executor> {
        &self.primary
    }

    /// The spare executor.
    #[must_use]
    pub fn spare(&self) -> &Arc<dyn Executor> {
        &self.spare
    }
}

impl Executor for DualExecutor {
    fn execute(&self, task: Task) -> Result<(), Rejected> {
        match self.primary.execute(task) {
            Ok(()) => Ok(()),
            Err(rejected) => {
                debug!(
                    task_id = rejected.task().id(),
                    reason = %rejected.reason(),
                    "primary rejected task, resubmitting to spare"
                );
                self.spare.execute(rejected.into_task())
            }
        }
    }

    fn queue_len(&self) -> usize {
        self.primary.queue_len().saturating_add(self.spare.queue_len())
    }

    fn shutdown(&self) {
        self.primary.shutdown();
        self.spare.shutdown();
    }

    fn shutdown_now(&self) -> Vec<Task> {
        let mut drained = self.primary.shutdown_now();
        drained.extend(self.spare.shutdown_now());
        drained
    }

    fn is_shutdown(&self) -> bool {
        self.primary.is_shutdown() && self.spare.is_shutdown()
    }

    fn is_terminated(&self) -> bool {
        self.primary.is_terminated() && self.spare.is_terminated()
    }

    fn await_termination(&self, timeout: Duration) -> bool {
        let half = timeout / 2;
        // both waits always run
        self.primary.await_termination(half) & self.spare.await_termination(timeout - half)
    }
}

impl std::fmt::Debug for DualExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DualExecutor")
            .field("queue_len", &self.queue_len())
            .field("is_shutdown", &self.is_shutdown())
            .finish_non_exhaustive()
    }
}
