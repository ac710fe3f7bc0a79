//! Infrastructure adapters: blocking queue backends.

pub mod queue;

pub use queue::{BlockingQueue, ChannelQueue, DualQueue, LinkedBlockingQueue, PollSplit};
