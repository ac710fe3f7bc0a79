//! Task wrapper running before/after hooks around the task body.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::error;

use crate::core::{HookFailure, Job, Task, TaskFailure, TaskId, TaskMeta};

/// Value a listener's `before_execute` produced, handed back to its
/// `after_execute`. A failed `before_execute` becomes that listener's `Err`.
pub type Attachment = Result<Box<dyn Any + Send>, HookFailure>;

/// Hooks around task execution.
pub trait TaskListener: Send + Sync {
    /// Runs on the worker thread right before the task body.
    ///
    /// # Errors
    ///
    /// A failure is passed to this listener's `after_execute`; other listeners
    /// and the task are unaffected.
    fn before_execute(&self, _meta: &TaskMeta) -> Attachment {
        Ok(Box::new(()))
    }

    /// Runs after the task body, whether or not it panicked.
    ///
    /// # Errors
    ///
    /// Failures are logged and swallowed.
    fn after_execute(
        &self,
        _meta: &TaskMeta,
        _failure: Option<&TaskFailure>,
        _attachment: Attachment,
    ) -> Result<(), HookFailure> {
        Ok(())
    }
}

/// A task decorated with listeners. Converts into a plain [`Task`] with the
/// same id and metadata.
pub struct ListenableTask {
    task: Task,
    listeners: Vec<Arc<dyn TaskListener>>,
}

impl ListenableTask {
    /// Wrap `task`; `listeners` run in order.
    pub fn new(task: Task, listeners: Vec<Arc<dyn TaskListener>>) -> Self {
        Self { task, listeners }
    }

    /// Run the hooks and the task on the current thread.
    ///
    /// # Panics
    ///
    /// Re-raises the task's own panic after every `after_execute` has run.
    pub fn run(self) {
        Task::from(self).run();
    }
}

impl From<ListenableTask> for Task {
    fn from(listenable: ListenableTask) -> Self {
        let ListenableTask { task, listeners } = listenable;
        let (id, meta, job) = task.into_parts();
        let hook_meta = Arc::clone(&meta);
        Self::from_parts(
            id,
            meta,
            Box::new(move || run_with_listeners(id, &hook_meta, job, &listeners)),
        )
    }
}

fn run_with_listeners(id: TaskId, meta: &TaskMeta, job: Job, listeners: &[Arc<dyn TaskListener>]) {
    let attachments: Vec<Attachment> = listeners
        .iter()
        .map(|listener| {
            let attachment = panic::catch_unwind(AssertUnwindSafe(|| listener.before_execute(meta)))
                .unwrap_or_else(|payload| Err(HookFailure::from_panic(payload.as_ref())));
            if let Err(e) = &attachment {
                error!(task_id = id, category = %meta.category, error = %e, "before_execute hook failed");
            }
            attachment
        })
        .collect();

    let outcome = panic::catch_unwind(AssertUnwindSafe(job));
    let failure = outcome
        .as_ref()
        .err()
        .map(|payload| TaskFailure::from_panic(payload.as_ref()));

    for (listener, attachment) in listeners.iter().zip(attachments) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            listener.after_execute(meta, failure.as_ref(), attachment)
        }))
        .unwrap_or_else(|payload| Err(HookFailure::from_panic(payload.as_ref())));
        if let Err(e) = result {
            error!(task_id = id, category = %meta.category, error = %e, "after_execute hook failed");
        }
    }

    if let Err(payload) = outcome {
        panic::resume_unwind(payload);
    }
}
