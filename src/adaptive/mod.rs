//! Adaptive layer: category routing, per-category latency statistics and
//! capacity policies on top of the core pools.

pub mod listener;
pub mod memo;
pub mod policy;
pub mod pool;
pub mod selector;
pub mod service;
pub mod stats;

pub use listener::{Attachment, ListenableTask, TaskListener};
pub use memo::KeyedInitializer;
pub use policy::{CapacityPolicy, ExecutorLoad, StaticPolicy, ThroughputPolicy, DEFAULT_POLICY_QUEUE_SIZE};
pub use pool::build_adaptive_pool;
pub use selector::{CategorySelector, ExecutorSelector};
pub use service::AdaptiveExecutorService;
pub use stats::CategoryStats;
