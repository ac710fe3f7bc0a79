//! Queue backed by a `crossbeam-channel`, used for high-throughput pools.

use std::time::Duration;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::warn;

use super::BlockingQueue;
use crate::core::QueueError;

/// FIFO queue over a crossbeam channel.
///
/// The queue owns both ends so it never disconnects. Removing an element from
/// the middle is not possible on a channel, so [`BlockingQueue::remove_where`]
/// always returns `None`. A pool using the original strategy therefore cannot
/// withdraw a task queued during shutdown; `PoolConfig::build_queue` picks the
/// lock queue for that strategy.
pub struct ChannelQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> ChannelQueue<T> {
    /// Bounded channel with room for `capacity` elements.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self { tx, rx }
    }

    /// Unbounded channel.
    #[must_use]
    pub fn unbounded() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }
}

impl<T: Send> BlockingQueue<T> for ChannelQueue<T> {
    fn offer(&self, item: T) -> Result<(), T> {
        self.tx.try_send(item).map_err(crossbeam_channel::TrySendError::into_inner)
    }

    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        self.tx
            .send_timeout(item, timeout)
            .map_err(crossbeam_channel::SendTimeoutError::into_inner)
    }

    fn put(&self, item: T) {
        if self.tx.send(item).is_err() {
            warn!("channel queue disconnected, element dropped");
        }
    }

    fn poll(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    fn poll_timeout(&self, timeout: Duration) -> Option<T> {
        self.rx.recv_timeout(timeout).ok()
    }

    fn remove_where(&self, _pred: &dyn Fn(&T) -> bool) -> Option<T> {
        None
    }

    fn len(&self) -> usize {
        self.rx.len()
    }

    fn remaining_capacity(&self) -> usize {
        self.tx
            .capacity()
            .map_or(usize::MAX, |cap| cap.saturating_sub(self.rx.len()))
    }

    fn drain_to(&self, sink: &mut Vec<T>, max: usize) -> Result<usize, QueueError> {
        let before = sink.len();
        sink.extend(self.rx.try_iter().take(max));
        Ok(sink.len() - before)
    }

    fn add_all(&self, items: Vec<T>) -> Result<(), QueueError> {
        if self.remaining_capacity() < items.len() {
            return Err(QueueError::Full);
        }
        for item in items {
            self.tx.try_send(item).map_err(|_| QueueError::Full)?;
        }
        Ok(())
    }

    fn clear(&self) {
        while self.rx.try_recv().is_ok() {}
    }
}
