//! Error types for executor, queue and configuration operations.

use std::any::Any;

use thiserror::Error;

use super::task::Task;

/// Errors raised while validating configuration or constructing components.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A value is out of its permitted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A derived value does not fit its representation.
    #[error("overflow: {0}")]
    Overflow(String),
}

/// Why an executor refused a task.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum RejectReason {
    /// Workers are at maximum and the queue is full.
    #[error("executor saturated")]
    Saturated,
    /// The executor is shutting down and accepts no new work.
    #[error("executor not accepting work")]
    Shutdown,
    /// The adaptive capacity policy declined the task.
    #[error("capacity policy declined the task")]
    PolicyDeclined,
    /// No executor is configured for the task's category.
    #[error("no executor for task category")]
    NoRoute,
    /// Task metadata failed validation.
    #[error("invalid task metadata")]
    InvalidTask,
}

/// Rejection signal. Carries the refused task back so callers can retry it
/// elsewhere without losing it.
#[derive(Debug, Error)]
#[error("task {} rejected: {reason}", .task.id())]
pub struct Rejected {
    reason: RejectReason,
    task: Task,
}

impl Rejected {
    /// Create a rejection for `task`.
    #[must_use]
    pub const fn new(reason: RejectReason, task: Task) -> Self {
        Self { reason, task }
    }

    /// The reason the task was refused.
    #[must_use]
    pub const fn reason(&self) -> RejectReason {
        self.reason
    }

    /// Borrow the refused task.
    #[must_use]
    pub const fn task(&self) -> &Task {
        &self.task
    }

    /// Take back ownership of the refused task.
    #[must_use]
    pub fn into_task(self) -> Task {
        self.task
    }
}

/// Errors reported by a [`TaskHandle`](super::TaskHandle) when waiting for a result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    /// The task was cancelled before it started.
    #[error("task cancelled")]
    Cancelled,
    /// The task panicked.
    #[error("task panicked: {0}")]
    Panicked(String),
    /// The result did not arrive within the timeout.
    #[error("timed out waiting for task")]
    Timeout,
    /// The task was dropped without running (rejected or discarded on shutdown).
    #[error("task dropped before completion")]
    Abandoned,
    /// The result was already taken by an earlier join.
    #[error("task result already taken")]
    AlreadyTaken,
}

/// Errors from queue operations that cannot be expressed as a returned element.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue cannot provide this operation consistently.
    #[error("unsupported queue operation: {0}")]
    Unsupported(&'static str),
    /// The queue has no room for all elements.
    #[error("queue full")]
    Full,
}

/// Failure of a single listener hook. Isolated to that hook; other hooks and
/// the task itself still run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HookFailure {
    /// The hook returned an error.
    #[error("hook failed: {0}")]
    Failed(String),
    /// The hook panicked.
    #[error("hook panicked: {0}")]
    Panicked(String),
}

impl HookFailure {
    /// Build a failure from a caught panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::Panicked(panic_message(payload))
    }
}

/// Description of a task failure (a panic inside the task body).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    /// Panic message, or a placeholder for non-string payloads.
    pub message: String,
}

impl TaskFailure {
    /// Build a failure description from a panic payload.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self {
            message: panic_message(payload),
        }
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "task failed: {}", self.message)
    }
}

/// Extract a readable message from a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
