//! Configuration models for pools, queues and statistics windows.

pub mod pool;
pub mod window;

pub use pool::{ExecutorSetConfig, PoolConfig, QueueConfig, StrategyKind, SMALL_QUEUE_CAPACITY};
pub use window::{IntervalUnit, WindowConfig, WindowConfigRaw};
