//! Pool, queue and executor-set configuration structures.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::window::WindowConfig;
use crate::core::{AdmissionStrategy, EagerStrategy, OriginalStrategy, DEFAULT_STACK_SIZE};
use crate::infra::queue::{BlockingQueue, ChannelQueue, LinkedBlockingQueue};

/// Bounded queues at or below this capacity use the lock queue unless
/// throughput is preferred.
pub const SMALL_QUEUE_CAPACITY: usize = 100;

/// Admission strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Queue before growing past the core size.
    Original,
    /// Grow past the core size while queued tasks outnumber workers.
    #[default]
    Eager,
}

impl StrategyKind {
    /// Instantiate the strategy.
    #[must_use]
    pub fn build(self) -> Arc<dyn AdmissionStrategy> {
        match self {
            Self::Original => Arc::new(OriginalStrategy),
            Self::Eager => Arc::new(EagerStrategy),
        }
    }
}

/// Work queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Whether the queue has a capacity limit.
    pub bounded: bool,
    /// Capacity for bounded queues.
    pub capacity: usize,
    /// Prefer the channel-backed queue even for small capacities.
    pub prefer_higher_throughput: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            bounded: true,
            capacity: 1_000,
            prefer_higher_throughput: true,
        }
    }
}

impl QueueConfig {
    /// Bounded queue with `capacity` slots.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        Self {
            bounded: true,
            capacity,
            ..Self::default()
        }
    }

    /// Unbounded queue.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            bounded: false,
            ..Self::default()
        }
    }

    /// Prefer throughput over the lock queue for small capacities.
    #[must_use]
    pub const fn with_prefer_higher_throughput(mut self, prefer: bool) -> Self {
        self.prefer_higher_throughput = prefer;
        self
    }

    /// Validate queue configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.bounded && self.capacity == 0 {
            return Err("bounded queue capacity must be greater than 0".into());
        }
        Ok(())
    }

    /// Build the queue this configuration describes.
    #[must_use]
    pub fn build<T: Send + 'static>(&self) -> Arc<dyn BlockingQueue<T>> {
        if !self.bounded {
            return Arc::new(LinkedBlockingQueue::unbounded());
        }
        if self.capacity <= SMALL_QUEUE_CAPACITY && !self.prefer_higher_throughput {
            Arc::new(LinkedBlockingQueue::bounded(self.capacity))
        } else {
            Arc::new(ChannelQueue::bounded(self.capacity))
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Workers kept alive while idle.
    pub core_pool_size: usize,
    /// Upper bound on workers.
    pub max_pool_size: usize,
    /// Idle time after which workers above the core size retire.
    pub keep_alive_ms: u64,
    /// Work queue.
    pub queue: QueueConfig,
    /// Worker thread name prefix; threads are named `{prefix}{n}`.
    pub thread_name_prefix: String,
    /// Daemon workers are not waited for when the pool is dropped.
    pub daemon: bool,
    /// Admission strategy.
    pub strategy: StrategyKind,
    /// Stack size for each worker thread in bytes.
    pub thread_stack_size: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let cpus = num_cpus::get();
        Self {
            core_pool_size: cpus,
            max_pool_size: cpus * 2,
            keep_alive_ms: 60_000,
            queue: QueueConfig::default(),
            thread_name_prefix: "pool-".into(),
            daemon: false,
            strategy: StrategyKind::default(),
            thread_stack_size: DEFAULT_STACK_SIZE,
        }
    }
}

impl PoolConfig {
    /// Config with the given core and maximum sizes and defaults elsewhere.
    #[must_use]
    pub fn new(core_pool_size: usize, max_pool_size: usize) -> Self {
        Self {
            core_pool_size,
            max_pool_size,
            ..Self::default()
        }
    }

    /// Set the keep-alive for workers above the core size.
    #[must_use]
    pub const fn with_keep_alive_ms(mut self, keep_alive_ms: u64) -> Self {
        self.keep_alive_ms = keep_alive_ms;
        self
    }

    /// Set the work queue.
    #[must_use]
    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Set the thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the daemon flag.
    #[must_use]
    pub const fn with_daemon(mut self, daemon: bool) -> Self {
        self.daemon = daemon;
        self
    }

    /// Set the admission strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: StrategyKind) -> Self {
        self.strategy = strategy;
        self
    }

    /// Set the worker stack size.
    #[must_use]
    pub const fn with_thread_stack_size(mut self, size: usize) -> Self {
        self.thread_stack_size = size;
        self
    }

    /// Validate pool configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_pool_size == 0 {
            return Err("max_pool_size must be greater than 0".into());
        }
        if self.core_pool_size > self.max_pool_size {
            return Err(format!(
                "core_pool_size ({}) must not exceed max_pool_size ({})",
                self.core_pool_size, self.max_pool_size
            ));
        }
        if self.thread_stack_size == 0 {
            return Err("thread_stack_size must be greater than 0".into());
        }
        if self.thread_name_prefix.trim().is_empty() {
            return Err("thread_name_prefix must not be blank".into());
        }
        self.queue.validate()
    }

    /// Build the work queue for this pool.
    ///
    /// The original strategy withdraws a task it queued while the pool was
    /// stopping, which needs [`BlockingQueue::remove_where`]. Channel queues
    /// cannot remove, so bounded queues use the lock queue under that strategy.
    #[must_use]
    pub fn build_queue<T: Send + 'static>(&self) -> Arc<dyn BlockingQueue<T>> {
        match self.strategy {
            StrategyKind::Original if self.queue.bounded => {
                Arc::new(LinkedBlockingQueue::bounded(self.queue.capacity))
            }
            _ => self.queue.build(),
        }
    }
}

/// A named set of pools plus the shared settings of an adaptive service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorSetConfig {
    /// Map of pool name to configuration.
    pub pools: HashMap<String, PoolConfig>,
    /// Statistics window for per-category latency tracking.
    #[serde(default)]
    pub window: WindowConfig,
    /// Spare overflow queue shared by all adaptive pools.
    #[serde(default = "QueueConfig::unbounded")]
    pub spare_queue: QueueConfig,
    /// Category to pool name. Categories without a route use the pool of the
    /// same name.
    #[serde(default)]
    pub routes: HashMap<String, String>,
    /// Pool used for categories with no route and no pool of their own.
    #[serde(default)]
    pub default_pool: Option<String>,
    /// Queue size used by the static capacity policy.
    #[serde(default = "default_policy_queue_size")]
    pub policy_queue_size: usize,
}

const fn default_policy_queue_size() -> usize {
    1_000
}

impl ExecutorSetConfig {
    /// Validate all pools, routes and the default pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        self.spare_queue
            .validate()
            .map_err(|e| format!("spare queue invalid: {e}"))?;
        for (category, pool) in &self.routes {
            if !self.pools.contains_key(pool) {
                return Err(format!("route `{category}` targets unknown pool `{pool}`"));
            }
        }
        if let Some(pool) = &self.default_pool {
            if !self.pools.contains_key(pool) {
                return Err(format!("default_pool `{pool}` is not defined"));
            }
        }
        if self.policy_queue_size == 0 {
            return Err("policy_queue_size must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
