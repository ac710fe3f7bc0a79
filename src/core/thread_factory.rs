//! Worker thread creation.

use std::fmt;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, JoinHandle};

/// Default stack size for worker threads (2 MiB).
pub const DEFAULT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Creates the OS threads a pool runs its workers on.
pub trait ThreadFactory: Send + Sync + fmt::Debug {
    /// Spawn a thread running `body`.
    ///
    /// # Errors
    ///
    /// Propagates the OS error if the thread cannot be created.
    fn spawn(&self, body: Box<dyn FnOnce() + Send + 'static>) -> io::Result<JoinHandle<()>>;

    /// Daemon workers are not waited for when their pool is dropped.
    fn is_daemon(&self) -> bool;
}

/// Names threads `{prefix}{n}` with `n` counting from 1.
#[derive(Debug)]
pub struct NamedThreadFactory {
    prefix: String,
    daemon: bool,
    stack_size: usize,
    counter: AtomicU64,
}

impl NamedThreadFactory {
    /// Factory producing non-daemon threads named `{prefix}{n}`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            daemon: false,
            stack_size: DEFAULT_STACK_SIZE,
            counter: AtomicU64::new(1),
        }
    }

    /// Mark produced threads as daemon.
    #[must_use]
    pub const fn with_daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    /// Stack size for produced threads.
    #[must_use]
    pub const fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Thread name prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl ThreadFactory for NamedThreadFactory {
    fn spawn(&self, body: Box<dyn FnOnce() + Send + 'static>) -> io::Result<JoinHandle<()>> {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        thread::Builder::new()
            .name(format!("{}{n}", self.prefix))
            .stack_size(self.stack_size)
            .spawn(body)
    }

    fn is_daemon(&self) -> bool {
        self.daemon
    }
}
