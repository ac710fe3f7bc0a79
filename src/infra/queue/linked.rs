//! Mutex/Condvar backed FIFO queue, optionally bounded.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use super::BlockingQueue;
use crate::core::QueueError;

/// FIFO queue guarded by one `parking_lot::Mutex` with separate
/// `not_empty`/`not_full` Condvars.
pub struct LinkedBlockingQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    not_empty: Condvar,
    not_full: Condvar,
}

impl<T> LinkedBlockingQueue<T> {
    /// Queue holding at most `capacity` elements.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Queue without a capacity limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity: usize::MAX,
            not_empty: Condvar::new(),
            not_full: Condvar::new(),
        }
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<T: Send> BlockingQueue<T> for LinkedBlockingQueue<T> {
    fn offer(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock();
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    fn offer_timeout(&self, item: T, timeout: Duration) -> Result<(), T> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            self.put(item);
            return Ok(());
        };
        let mut items = self.items.lock();
        while items.len() >= self.capacity {
            if self.not_full.wait_until(&mut items, deadline).timed_out()
                && items.len() >= self.capacity
            {
                return Err(item);
            }
        }
        items.push_back(item);
        self.not_empty.notify_one();
        Ok(())
    }

    fn put(&self, item: T) {
        let mut items = self.items.lock();
        while items.len() >= self.capacity {
            self.not_full.wait(&mut items);
        }
        items.push_back(item);
        self.not_empty.notify_one();
    }

    fn poll(&self) -> Option<T> {
        let mut items = self.items.lock();
        let item = items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    fn poll_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now().checked_add(timeout);
        let mut items = self.items.lock();
        while items.is_empty() {
            match deadline {
                Some(deadline) => {
                    if self.not_empty.wait_until(&mut items, deadline).timed_out() {
                        break;
                    }
                }
                None => self.not_empty.wait(&mut items),
            }
        }
        let item = items.pop_front();
        if item.is_some() {
            self.not_full.notify_one();
        }
        item
    }

    fn remove_where(&self, pred: &dyn Fn(&T) -> bool) -> Option<T> {
        let mut items = self.items.lock();
        let idx = items.iter().position(pred)?;
        let item = items.remove(idx);
        self.not_full.notify_one();
        item
    }

    fn len(&self) -> usize {
        self.items.lock().len()
    }

    fn remaining_capacity(&self) -> usize {
        self.capacity.saturating_sub(self.len())
    }

    fn drain_to(&self, sink: &mut Vec<T>, max: usize) -> Result<usize, QueueError> {
        let mut items = self.items.lock();
        let n = items.len().min(max);
        sink.extend(items.drain(..n));
        if n > 0 {
            self.not_full.notify_all();
        }
        Ok(n)
    }

    fn add_all(&self, new_items: Vec<T>) -> Result<(), QueueError> {
        let mut items = self.items.lock();
        if self.capacity.saturating_sub(items.len()) < new_items.len() {
            return Err(QueueError::Full);
        }
        items.extend(new_items);
        self.not_empty.notify_all();
        Ok(())
    }

    fn clear(&self) {
        self.items.lock().clear();
        self.not_full.notify_all();
    }
}
