//! Ring of time buckets over a trailing interval.
//!
//! A [`LeapArray`] holds `sample_count` slots, each a [`WindowWrap`] covering
//! `window_length_ms`. A timestamp `t` maps to slot
//! `(t / window_length_ms) % sample_count`. When that slot still holds an older
//! window it is reset in place: the thread that wins the slot's `try_lock`
//! notifies listeners and resets it, every other thread yields and retries.
//!
//! The hot path (slot already current) takes no lock.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread;

use parking_lot::{Mutex, RwLock};
use tracing::error;

use crate::config::WindowConfig;
use crate::core::HookFailure;
use crate::util::now_ms;

/// Payload stored in each bucket.
pub trait LeapBucket: Send + Sync + 'static {
    /// A zero-valued bucket for the window starting at `window_start`.
    fn new_empty(window_start: u64) -> Self;

    /// Clear the bucket's counters in place.
    fn reset(&self);
}

/// Observer invoked immediately before a bucket is overwritten.
pub trait LeapArrayListener<T: LeapBucket, ID>: Send + Sync {
    /// `doomed` still holds its final data when this runs.
    ///
    /// # Errors
    ///
    /// Errors and panics are logged and ignored; the reset always proceeds.
    fn on_bucket_deprecated(
        &self,
        id: &ID,
        array: &LeapArray<T, ID>,
        doomed: &WindowWrap<T>,
    ) -> Result<(), HookFailure>;
}

/// One bucket plus its validity interval `[start, start + length)`.
pub struct WindowWrap<T> {
    window_length_ms: u64,
    window_start: AtomicU64,
    value: T,
}

impl<T> WindowWrap<T> {
    fn new(window_length_ms: u64, window_start: u64, value: T) -> Self {
        Self {
            window_length_ms,
            window_start: AtomicU64::new(window_start),
            value,
        }
    }

    /// Start of the window in epoch milliseconds.
    #[must_use]
    pub fn window_start(&self) -> u64 {
        self.window_start.load(Ordering::Acquire)
    }

    /// Window length in milliseconds.
    #[must_use]
    pub const fn window_length_ms(&self) -> u64 {
        self.window_length_ms
    }

    /// Bucket payload.
    #[must_use]
    pub const fn value(&self) -> &T {
        &self.value
    }

    /// Whether `t` falls in `[start, start + length)`.
    #[must_use]
    pub fn contains(&self, t: u64) -> bool {
        let start = self.window_start();
        start <= t && t < start.saturating_add(self.window_length_ms)
    }
}

impl<T: LeapBucket> WindowWrap<T> {
    /// Clear the payload, then publish the new start. Callers must hold the
    /// slot's reset lock.
    fn reset_to(&self, window_start: u64) {
        self.value.reset();
        self.window_start.store(window_start, Ordering::Release);
    }
}

impl<T: fmt::Debug> fmt::Debug for WindowWrap<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowWrap")
            .field("window_start", &self.window_start())
            .field("window_length_ms", &self.window_length_ms)
            .field("value", &self.value)
            .finish()
    }
}

/// Fixed-size ring of lazily allocated buckets, keyed for listeners by `ID`.
pub struct LeapArray<T: LeapBucket, ID> {
    id: ID,
    window_length_ms: u64,
    interval_ms: u64,
    slots: Box<[OnceLock<WindowWrap<T>>]>,
    reset_locks: Box<[Mutex<()>]>,
    listeners: RwLock<Vec<Arc<dyn LeapArrayListener<T, ID>>>>,
}

impl<T: LeapBucket, ID: fmt::Debug + Send + Sync> LeapArray<T, ID> {
    /// Empty array laid out by `config`. No bucket is allocated until used.
    pub fn new(id: ID, config: &WindowConfig) -> Self {
        let n = config.sample_count();
        Self {
            id,
            window_length_ms: config.window_length_ms(),
            interval_ms: config.interval_ms(),
            slots: (0..n).map(|_| OnceLock::new()).collect(),
            reset_locks: (0..n).map(|_| Mutex::new(())).collect(),
            listeners: RwLock::new(Vec::new()),
        }
    }

    /// Key this array was created for.
    pub const fn id(&self) -> &ID {
        &self.id
    }

    /// Bucket length in milliseconds.
    pub const fn window_length_ms(&self) -> u64 {
        self.window_length_ms
    }

    /// Trailing interval covered by the array, in milliseconds.
    pub const fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Number of slots.
    pub fn sample_count(&self) -> usize {
        self.slots.len()
    }

    /// Register a listener for bucket deprecation.
    pub fn add_listener(&self, listener: Arc<dyn LeapArrayListener<T, ID>>) {
        self.listeners.write().push(listener);
    }

    /// Bucket for the current wall-clock time.
    pub fn current_window(&self) -> &WindowWrap<T> {
        self.current_window_at(now_ms())
    }

    /// Bucket covering `t`, allocating or resetting the slot as needed.
    ///
    /// If `t` is older than the slot's current window (clock went backwards),
    /// the slot is returned unchanged.
    #[allow(clippy::cast_possible_truncation)]
    pub fn current_window_at(&self, t: u64) -> &WindowWrap<T> {
        let window_start = t - t % self.window_length_ms;
        let idx = ((t / self.window_length_ms) % self.slots.len() as u64) as usize;
        let wrap = self.slots[idx].get_or_init(|| {
            WindowWrap::new(self.window_length_ms, window_start, T::new_empty(window_start))
        });
        loop {
            let old_start = wrap.window_start();
            if old_start >= window_start {
                return wrap;
            }
            if let Some(_guard) = self.reset_locks[idx].try_lock() {
                if wrap.window_start() < window_start {
                    self.notify_deprecated(wrap);
                    wrap.reset_to(window_start);
                }
                return wrap;
            }
            thread::yield_now();
        }
    }

    /// Buckets valid at `t`, ordered by window start.
    ///
    /// A bucket is valid when it started no later than `t` and no more than
    /// `interval_ms` before it.
    pub fn list_at(&self, t: u64) -> Vec<&WindowWrap<T>> {
        let mut valid: Vec<&WindowWrap<T>> = self
            .slots
            .iter()
            .filter_map(OnceLock::get)
            .filter(|w| {
                let start = w.window_start();
                start <= t && t - start <= self.interval_ms
            })
            .collect();
        valid.sort_by_key(|w| w.window_start());
        valid
    }

    /// Buckets valid now.
    pub fn list(&self) -> Vec<&WindowWrap<T>> {
        self.list_at(now_ms())
    }

    fn notify_deprecated(&self, doomed: &WindowWrap<T>) {
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.on_bucket_deprecated(&self.id, self, doomed)
            }));
            let failure = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(payload) => HookFailure::from_panic(payload.as_ref()),
            };
            error!(
                id = ?self.id,
                window_start = doomed.window_start(),
                error = %failure,
                "bucket deprecation listener failed"
            );
        }
    }
}

impl<T: LeapBucket, ID: fmt::Debug> fmt::Debug for LeapArray<T, ID> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LeapArray")
            .field("id", &self.id)
            .field("window_length_ms", &self.window_length_ms)
            .field("interval_ms", &self.interval_ms)
            .field("sample_count", &self.slots.len())
            .finish_non_exhaustive()
    }
}
