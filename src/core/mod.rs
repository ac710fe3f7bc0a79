//! Core execution abstractions: tasks, executors, admission strategies and pools.

pub mod context;
pub mod dual_executor;
pub mod error;
pub mod executor;
pub mod handle;
pub mod strategy;
pub mod task;
pub mod thread_factory;
pub mod worker_pool;

pub use context::PoolContext;
pub use dual_executor::DualExecutor;
pub use error::{
    panic_message, AppResult, ConfigError, HookFailure, QueueError, RejectReason, Rejected, TaskError,
    TaskFailure,
};
pub use executor::{submit, Executor};
pub use handle::TaskHandle;
pub use strategy::{AdmissionStrategy, EagerStrategy, OriginalStrategy};
pub use task::{
    Job, Task, TaskId, TaskMeta, DEFAULT_TASK_CATEGORY, DEFAULT_UPSTREAM_TIMEOUT_MS, PRIORITY_MAX,
    PRIORITY_MIN,
};
pub use thread_factory::{NamedThreadFactory, ThreadFactory, DEFAULT_STACK_SIZE};
pub use worker_pool::{ExtendedPool, ExtendedPoolBuilder, PoolStats};
