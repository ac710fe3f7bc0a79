//! Result handle for submitted tasks.
//!
//! A [`TaskHandle`] is the caller's side of a submitted task. The worker side
//! is a completion guard captured by the task body: it records the outcome and
//! wakes waiters through a `parking_lot` Condvar, the same slot design the
//! worker pool uses for results. If the task body is dropped without running
//! (rejected, or discarded by `shutdown_now`), the guard resolves the handle as
//! [`TaskError::Abandoned`] so no waiter blocks forever.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::error::{TaskError, TaskFailure};
use super::task::{Task, TaskId, TaskMeta};

enum SlotState<R> {
    Pending,
    Running,
    Done(R),
    Failed(String),
    Cancelled,
    Abandoned,
    Taken,
}

impl<R> SlotState<R> {
    const fn is_finished(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

struct Slot<R> {
    state: Mutex<SlotState<R>>,
    ready: Condvar,
}

/// Worker-side half: resolves the slot exactly once, or as abandoned on drop.
struct Completer<R> {
    slot: Arc<Slot<R>>,
    resolved: bool,
}

impl<R> Completer<R> {
    /// Move the slot to `Running`. Returns false if the task was cancelled.
    fn start(&mut self) -> bool {
        let mut state = self.slot.state.lock();
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Running;
            true
        } else {
            self.resolved = true;
            false
        }
    }

    fn finish(&mut self, outcome: SlotState<R>) {
        let mut state = self.slot.state.lock();
        *state = outcome;
        self.resolved = true;
        self.slot.ready.notify_all();
    }
}

impl<R> Drop for Completer<R> {
    fn drop(&mut self) {
        if self.resolved {
            return;
        }
        let mut state = self.slot.state.lock();
        if !state.is_finished() {
            *state = SlotState::Abandoned;
            self.slot.ready.notify_all();
        }
    }
}

/// Caller-side handle to a submitted task's result.
pub struct TaskHandle<R> {
    id: TaskId,
    slot: Arc<Slot<R>>,
}

impl<R: Send + 'static> TaskHandle<R> {
    /// Wrap `f` into a [`Task`] whose result is delivered to the returned handle.
    ///
    /// A panic in `f` is recorded as [`TaskError::Panicked`] and then re-raised
    /// unchanged, so outer wrappers and the worker still observe it.
    pub fn bind<F>(meta: TaskMeta, f: F) -> (Task, Self)
    where
        F: FnOnce() -> R + Send + 'static,
    {
        let slot = Arc::new(Slot {
            state: Mutex::new(SlotState::Pending),
            ready: Condvar::new(),
        });
        let mut completer = Completer {
            slot: Arc::clone(&slot),
            resolved: false,
        };
        let task = Task::new(meta, move || {
            if !completer.start() {
                return;
            }
            match panic::catch_unwind(AssertUnwindSafe(f)) {
                Ok(value) => completer.finish(SlotState::Done(value)),
                Err(payload) => {
                    let failure = TaskFailure::from_panic(payload.as_ref());
                    completer.finish(SlotState::Failed(failure.message));
                    panic::resume_unwind(payload);
                }
            }
        });
        let handle = Self { id: task.id(), slot };
        (task, handle)
    }
}

impl<R> TaskHandle<R> {
    /// Id of the underlying task.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Cancel the task if it has not started yet.
    ///
    /// Returns true if the task will not run. A running task cannot be
    /// interrupted; in that case this returns false.
    pub fn cancel(&self) -> bool {
        let mut state = self.slot.state.lock();
        if matches!(*state, SlotState::Pending) {
            *state = SlotState::Cancelled;
            self.slot.ready.notify_all();
            true
        } else {
            false
        }
    }

    /// Whether the task has reached a final state.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.slot.state.lock().is_finished()
    }

    /// Whether the task was cancelled before it started.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(*self.slot.state.lock(), SlotState::Cancelled)
    }

    /// Take the result if the task has finished, without blocking.
    ///
    /// # Errors
    ///
    /// `TaskError::Timeout` if the task is still pending or running, otherwise
    /// the task's own terminal error.
    pub fn try_join(&self) -> Result<R, TaskError> {
        let mut state = self.slot.state.lock();
        take_outcome(&mut state).unwrap_or(Err(TaskError::Timeout))
    }

    /// Block until the task finishes or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// `TaskError::Timeout` on expiry, otherwise the task's terminal error.
    pub fn join_timeout(&self, timeout: Duration) -> Result<R, TaskError> {
        let deadline = Instant::now().checked_add(timeout);
        let mut state = self.slot.state.lock();
        loop {
            if let Some(outcome) = take_outcome(&mut state) {
                return outcome;
            }
            match deadline {
                Some(deadline) => {
                    if self.slot.ready.wait_until(&mut state, deadline).timed_out() {
                        return take_outcome(&mut state).unwrap_or(Err(TaskError::Timeout));
                    }
                }
                None => self.slot.ready.wait(&mut state),
            }
        }
    }

    /// Block until the task finishes.
    ///
    /// # Errors
    ///
    /// The task's terminal error (`Cancelled`, `Panicked`, `Abandoned`).
    pub fn join(self) -> Result<R, TaskError> {
        let mut state = self.slot.state.lock();
        loop {
            if let Some(outcome) = take_outcome(&mut state) {
                return outcome;
            }
            self.slot.ready.wait(&mut state);
        }
    }
}

#[cfg(feature = "tokio-runtime")]
impl<R: Send + 'static> TaskHandle<R> {
    /// Wait for the result from async code.
    ///
    /// The Condvar wait runs on tokio's blocking pool so the async runtime is
    /// never blocked.
    ///
    /// # Errors
    ///
    /// `TaskError::Timeout` on expiry, otherwise the task's terminal error.
    pub async fn join_async(self, timeout: Duration) -> Result<R, TaskError> {
        let waited = tokio::time::timeout(
            timeout,
            tokio::task::spawn_blocking(move || self.join_timeout(timeout)),
        )
        .await;
        match waited {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(join_err)) => Err(TaskError::Panicked(join_err.to_string())),
            Err(_) => Err(TaskError::Timeout),
        }
    }
}

impl<R> std::fmt::Debug for TaskHandle<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("done", &self.is_done())
            .finish()
    }
}

fn take_outcome<R>(state: &mut SlotState<R>) -> Option<Result<R, TaskError>> {
    if !state.is_finished() {
        return None;
    }
    let outcome = match std::mem::replace(state, SlotState::Taken) {
        SlotState::Done(value) => Ok(value),
        SlotState::Failed(message) => {
            *state = SlotState::Failed(message.clone());
            Err(TaskError::Panicked(message))
        }
        SlotState::Cancelled => {
            *state = SlotState::Cancelled;
            Err(TaskError::Cancelled)
        }
        SlotState::Abandoned => {
            *state = SlotState::Abandoned;
            Err(TaskError::Abandoned)
        }
        SlotState::Taken => Err(TaskError::AlreadyTaken),
        SlotState::Pending | SlotState::Running => unreachable!("checked by is_finished"),
    };
    Some(outcome)
}
