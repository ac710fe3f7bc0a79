//! Tests for error types

use adaptive_pool::core::{
    ConfigError, HookFailure, QueueError, RejectReason, Rejected, Task, TaskError, TaskFailure,
    TaskMeta,
};

#[test]
fn test_config_error_display() {
    let err = ConfigError::InvalidArgument("sample_count must be greater than 0".to_string());
    assert_eq!(format!("{}", err), "invalid argument: sample_count must be greater than 0");
    let err = ConfigError::Overflow("too long".to_string());
    assert_eq!(format!("{}", err), "overflow: too long");
}

#[test]
fn test_reject_reason_display() {
    assert_eq!(RejectReason::Saturated.to_string(), "executor saturated");
    assert_eq!(RejectReason::Shutdown.to_string(), "executor not accepting work");
    assert_eq!(RejectReason::PolicyDeclined.to_string(), "capacity policy declined the task");
    assert_eq!(RejectReason::NoRoute.to_string(), "no executor for task category");
    assert_eq!(RejectReason::InvalidTask.to_string(), "invalid task metadata");
}

#[test]
fn test_rejected_hands_task_back() {
    let task = Task::new(TaskMeta::new("db"), || {});
    let id = task.id();
    let rejected = Rejected::new(RejectReason::NoRoute, task);
    assert_eq!(rejected.task().meta().category, "db");
    assert_eq!(rejected.into_task().id(), id);
}

#[test]
fn test_task_error_display() {
    assert_eq!(TaskError::Cancelled.to_string(), "task cancelled");
    assert_eq!(TaskError::Panicked("boom".into()).to_string(), "task panicked: boom");
    assert_eq!(TaskError::Timeout.to_string(), "timed out waiting for task");
    assert_eq!(TaskError::Abandoned.to_string(), "task dropped before completion");
}

#[test]
fn test_queue_error_display() {
    assert_eq!(
        QueueError::Unsupported("drain_to on a dual queue").to_string(),
        "unsupported queue operation: drain_to on a dual queue"
    );
    assert_eq!(QueueError::Full.to_string(), "queue full");
}

#[test]
fn test_hook_and_task_failures_from_panic() {
    let payload: Box<dyn std::any::Any + Send> = Box::new("listener broke");
    assert_eq!(
        HookFailure::from_panic(payload.as_ref()),
        HookFailure::Panicked("listener broke".into())
    );
    let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("task broke"));
    let failure = TaskFailure::from_panic(payload.as_ref());
    assert_eq!(failure.to_string(), "task failed: task broke");
}

#[test]
fn test_config_error_into_anyhow() {
    let result: adaptive_pool::core::AppResult<()> =
        Err(ConfigError::InvalidArgument("x".into()).into());
    assert_eq!(result.unwrap_err().to_string(), "invalid argument: x");
}
