//! Blocking queue backends shared by worker pools.
//!
//! Every backend implements [`BlockingQueue`]. Pools hold queues as
//! `Arc<dyn BlockingQueue<Task>>` so that a single spare tier can be shared by
//! several [`DualQueue`]s.

pub mod channel;
pub mod dual;
pub mod linked;

use std::time::Duration;

use crate::core::QueueError;

pub use channel::ChannelQueue;
pub use dual::{DualQueue, PollSplit, DEFAULT_POLL_SLICE};
pub use linked::LinkedBlockingQueue;

/// Slice used by the default [`BlockingQueue::take`] loop.
const TAKE_TICK: Duration = Duration::from_millis(100);

/// Thread-safe FIFO queue with blocking and timed operations.
///
/// Operations that fail to insert hand the element back in `Err` so callers
/// never lose work.
pub trait BlockingQueue<T: Send>: Send + Sync {
    /// Insert without blocking. Returns the element if the queue is full.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` when there is no capacity.
    fn offer(&self, item: T) -> Result<(), T>;

    /// Insert, waiting up to `timeout` for capacity.
    ///
    /// # Errors
    ///
    /// Returns `Err(item)` when no capacity became available in time.
    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T>;

    /// Insert, waiting as long as needed for capacity.
    fn put(&self, item: T);

    /// Remove the head without blocking.
    fn poll(&self) -> Option<T>;

    /// Remove the head, waiting up to `timeout` for one to arrive.
    fn poll_timeout(&self, timeout: Duration) -> Option<T>;

    /// Timed variant of `take`. Queues that distinguish a preferred tier only
    /// consult that tier here.
    fn take_timeout(&self, timeout: Duration) -> Option<T> {
        self.poll_timeout(timeout)
    }

    /// Non-blocking variant of `take`.
    fn try_take(&self) -> Option<T> {
        self.poll()
    }

    /// Remove the head, waiting as long as needed.
    fn take(&self) -> T {
        loop {
            if let Some(item) = self.take_timeout(TAKE_TICK) {
                return item;
            }
        }
    }

    /// Remove the first element matching `pred`. Backends that cannot remove
    /// from the middle return `None`.
    fn remove_where(&self, pred: &dyn Fn(&T) -> bool) -> Option<T>;

    /// Number of queued elements.
    fn len(&self) -> usize;

    /// Whether no elements are queued.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free slots; `usize::MAX`-ish for unbounded queues.
    fn remaining_capacity(&self) -> usize;

    /// Move up to `max` elements into `sink`, returning how many moved.
    ///
    /// # Errors
    ///
    /// `QueueError::Unsupported` if the backend cannot drain atomically.
    fn drain_to(&self, sink: &mut Vec<T>, max: usize) -> Result<usize, QueueError>;

    /// Insert every element or fail.
    ///
    /// # Errors
    ///
    /// `QueueError::Full` if capacity runs out, `QueueError::Unsupported` if the
    /// backend has no bulk insert.
    fn add_all(&self, items: Vec<T>) -> Result<(), QueueError>;

    /// Drop every queued element.
    fn clear(&self);
}
