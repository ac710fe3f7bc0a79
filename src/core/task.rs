//! Tagged task wrapper and per-task metadata.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// Unique identifier assigned to every task at creation.
pub type TaskId = u64;

/// Boxed task body.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Category used when a task does not declare one.
pub const DEFAULT_TASK_CATEGORY: &str = "__DEFAULT__";
/// Upstream timeout used when a task does not declare one.
pub const DEFAULT_UPSTREAM_TIMEOUT_MS: u64 = 3_000;
/// Lowest task priority.
pub const PRIORITY_MIN: u8 = 1;
/// Highest task priority.
pub const PRIORITY_MAX: u8 = 10;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Metadata attached to every submitted task, used for routing and
/// statistics keying.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskMeta {
    /// Task category. Must not be blank.
    pub category: String,
    /// Optional priority in `[PRIORITY_MIN, PRIORITY_MAX]`, higher is more urgent.
    #[serde(default)]
    pub priority: Option<u8>,
    /// Caller-side deadline in milliseconds (for example a gateway timeout).
    #[serde(default = "default_upstream_timeout_ms")]
    pub upstream_timeout_ms: u64,
}

const fn default_upstream_timeout_ms() -> u64 {
    DEFAULT_UPSTREAM_TIMEOUT_MS
}

impl TaskMeta {
    /// Metadata for `category` with no priority and the default upstream timeout.
    pub fn new(category: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            priority: None,
            upstream_timeout_ms: DEFAULT_UPSTREAM_TIMEOUT_MS,
        }
    }

    /// Set the task priority.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the upstream timeout in milliseconds.
    #[must_use]
    pub fn with_upstream_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.upstream_timeout_ms = timeout_ms;
        self
    }

    /// Upstream timeout as a `Duration`.
    #[must_use]
    pub const fn upstream_timeout(&self) -> Duration {
        Duration::from_millis(self.upstream_timeout_ms)
    }

    /// Validate category, priority range and timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidArgument` describing the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.category.trim().is_empty() {
            return Err(ConfigError::InvalidArgument("task category is blank".into()));
        }
        if let Some(p) = self.priority {
            if !(PRIORITY_MIN..=PRIORITY_MAX).contains(&p) {
                return Err(ConfigError::InvalidArgument(format!(
                    "task priority {p} outside [{PRIORITY_MIN}, {PRIORITY_MAX}]"
                )));
            }
        }
        if self.upstream_timeout_ms == 0 {
            return Err(ConfigError::InvalidArgument(
                "upstream_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TaskMeta {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_CATEGORY)
    }
}

/// A unit of work plus the metadata it was submitted with.
///
/// Wrappers (listeners, result handles) decompose a task with
/// [`Task::into_parts`] and rebuild it with [`Task::from_parts`], so the id and
/// metadata survive every layer of decoration.
pub struct Task {
    id: TaskId,
    meta: Arc<TaskMeta>,
    job: Job,
}

impl Task {
    /// Create a task with a fresh id.
    pub fn new<F>(meta: TaskMeta, job: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            meta: Arc::new(meta),
            job: Box::new(job),
        }
    }

    /// Create a task in the default category.
    pub fn from_fn<F>(job: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::new(TaskMeta::default(), job)
    }

    /// Reassemble a task from its parts.
    #[must_use]
    pub fn from_parts(id: TaskId, meta: Arc<TaskMeta>, job: Job) -> Self {
        Self { id, meta, job }
    }

    /// Split the task into id, metadata and body.
    #[must_use]
    pub fn into_parts(self) -> (TaskId, Arc<TaskMeta>, Job) {
        (self.id, self.meta, self.job)
    }

    /// Task id.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Task metadata.
    #[must_use]
    pub fn meta(&self) -> &TaskMeta {
        &self.meta
    }

    /// Run the task body on the current thread.
    pub fn run(self) {
        (self.job)();
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}
