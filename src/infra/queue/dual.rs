//! Two-tier queue: a private primary plus a spare overflow tier.
//!
//! The spare is usually shared by several pools. Producers only reach it when
//! the primary is full, and `take` never reads it, so a pool's core workers stay
//! on their own primary while timed (non-core) workers help drain the spare.

use std::sync::Arc;
use std::time::{Duration, Instant};

use super::BlockingQueue;
use crate::core::QueueError;

/// Default slice length for [`PollSplit::Alternating`].
pub const DEFAULT_POLL_SLICE: Duration = Duration::from_millis(5);

/// How a timed poll divides its budget between the two tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollSplit {
    /// Half the budget on primary, the other half on spare.
    HalfHalf,
    /// Alternate primary and spare in slices of `slice` until the budget is spent.
    Alternating {
        /// Length of one slice.
        slice: Duration,
    },
}

impl Default for PollSplit {
    fn default() -> Self {
        Self::Alternating {
            slice: DEFAULT_POLL_SLICE,
        }
    }
}

/// Primary-preferred queue with a spare fallback tier.
pub struct DualQueue<T> {
    primary: Arc<dyn BlockingQueue<T>>,
    spare: Arc<dyn BlockingQueue<T>>,
    split: PollSplit,
}

impl<T: Send + 'static> DualQueue<T> {
    /// Compose `primary` and `spare` with the half/half poll split.
    pub fn new(primary: Arc<dyn BlockingQueue<T>>, spare: Arc<dyn BlockingQueue<T>>) -> Self {
        Self {
            primary,
            spare,
            split: PollSplit::HalfHalf,
        }
    }

    /// Change how timed polls divide their budget.
    #[must_use]
    pub const fn with_poll_split(mut self, split: PollSplit) -> Self {
        self.split = split;
        self
    }

    /// Active poll split.
    #[must_use]
    pub const fn poll_split(&self) -> PollSplit {
        self.split
    }

    /// The primary tier.
    #[must_use]
    pub fn primary(&self) -> &Arc<dyn BlockingQueue<T>> {
        &self.primary
    }

    /// The spare tier.
    #[must_use]
    pub fn spare(&self) -> &Arc<dyn BlockingQueue<T>> {
        &self.spare
    }

    fn poll_alternating(&self, timeout: Duration, slice: Duration) -> Option<T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return self.poll_half_half(timeout);
        };
        let slice = slice.max(Duration::from_millis(1));
        let mut on_primary = true;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let tier = if on_primary { &self.primary } else { &self.spare };
            if let Some(item) = tier.poll_timeout(slice.min(remaining)) {
                return Some(item);
            }
            on_primary = !on_primary;
        }
        self.primary.poll()
    }

    fn poll_half_half(&self, timeout: Duration) -> Option<T> {
        let first = timeout / 2;
        self.primary
            .poll_timeout(first)
            .or_else(|| self.spare.poll_timeout(timeout.saturating_sub(first)))
            .or_else(|| self.primary.poll())
    }
}

impl<T: Send + 'static> BlockingQueue<T> for DualQueue<T> {
    fn offer(&self, item: T) -> Result<(), T> {
        match self.primary.offer(item) {
            Ok(()) => Ok(()),
            Err(item) => self.spare.offer(item),
        }
    }

    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        let first = timeout / 2;
        match self.primary.offer_timeout(item, first) {
            Ok(()) => Ok(()),
            Err(item) => self.spare.offer_timeout(item, timeout.saturating_sub(first)),
        }
    }

    fn put(&self, item: T) {
        if let Err(item) = self.primary.offer(item) {
            self.spare.put(item);
        }
    }

    fn poll(&self) -> Option<T> {
        self.primary.poll().or_else(|| self.spare.poll())
    }

    fn poll_timeout(&self, timeout: Duration) -> Option<T> {
        match self.split {
            PollSplit::HalfHalf => self.poll_half_half(timeout),
            PollSplit::Alternating { slice } => self.poll_alternating(timeout, slice),
        }
    }

    fn take_timeout(&self, timeout: Duration) -> Option<T> {
        self.primary.take_timeout(timeout)
    }

    fn try_take(&self) -> Option<T> {
        self.primary.try_take()
    }

    fn take(&self) -> T {
        self.primary.take()
    }

    fn remove_where(&self, pred: &dyn Fn(&T) -> bool) -> Option<T> {
        self.primary
            .remove_where(pred)
            .or_else(|| self.spare.remove_where(pred))
    }

    fn len(&self) -> usize {
        self.primary.len().saturating_add(self.spare.len())
    }

    fn remaining_capacity(&self) -> usize {
        self.primary
            .remaining_capacity()
            .saturating_add(self.spare.remaining_capacity())
    }

    fn drain_to(&self, _sink: &mut Vec<T>, _max: usize) -> Result<usize, QueueError> {
        Err(QueueError::Unsupported("drain_to on a dual queue"))
    }

    fn add_all(&self, _items: Vec<T>) -> Result<(), QueueError> {
        Err(QueueError::Unsupported("add_all on a dual queue"))
    }

    fn clear(&self) {
        self.primary.clear();
        self.spare.clear();
    }
}
