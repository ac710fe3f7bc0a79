//! Capacity policies deciding whether a category may commit more work.

use std::fmt;

use crate::core::TaskMeta;
use crate::stats::StatsResult;

/// Default queue size for [`StaticPolicy`].
pub const DEFAULT_POLICY_QUEUE_SIZE: usize = 1_000;

/// Load of the executor a task would be routed to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorLoad {
    /// Tasks waiting in the executor's queues.
    pub queued: usize,
}

/// Admission policy consulted before a task reaches its executor.
///
/// Implementations must fail closed: when in doubt, `could_commit` returns
/// false and the task is handed back to the caller.
pub trait CapacityPolicy: Send + Sync + fmt::Debug {
    /// Queue length this category can absorb without breaching its
    /// upstream timeout.
    fn suitable_queue_size(&self, meta: &TaskMeta, stats: Option<&StatsResult>) -> usize;

    /// Whether one more task of this category should be accepted.
    fn could_commit(&self, meta: &TaskMeta, stats: Option<&StatsResult>, load: &ExecutorLoad) -> bool;
}

/// Fixed queue size. Commits while the queue is below it and the observed
/// average latency is within the task's upstream timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticPolicy {
    queue_size: usize,
}

impl StaticPolicy {
    /// Policy admitting up to `queue_size` queued tasks.
    #[must_use]
    pub const fn new(queue_size: usize) -> Self {
        Self { queue_size }
    }

    /// Configured queue size.
    #[must_use]
    pub const fn queue_size(&self) -> usize {
        self.queue_size
    }
}

impl Default for StaticPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_POLICY_QUEUE_SIZE)
    }
}

#[allow(clippy::cast_precision_loss)]
fn within_timeout(meta: &TaskMeta, stats: Option<&StatsResult>) -> bool {
    stats.map_or(true, |s| s.avg_latency_ms <= meta.upstream_timeout_ms as f64)
}

impl CapacityPolicy for StaticPolicy {
    fn suitable_queue_size(&self, _meta: &TaskMeta, _stats: Option<&StatsResult>) -> usize {
        self.queue_size
    }

    fn could_commit(&self, meta: &TaskMeta, stats: Option<&StatsResult>, load: &ExecutorLoad) -> bool {
        load.queued < self.queue_size && within_timeout(meta, stats)
    }
}

/// Sizes the queue from observed throughput: a category may queue as many
/// tasks as it completes within its upstream timeout, between 1 and
/// `max_queue_size`.
///
/// With no observations yet it behaves like [`StaticPolicy`] at
/// `max_queue_size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThroughputPolicy {
    max_queue_size: usize,
}

impl ThroughputPolicy {
    /// Policy capped at `max_queue_size` queued tasks.
    #[must_use]
    pub const fn new(max_queue_size: usize) -> Self {
        Self { max_queue_size }
    }
}

impl CapacityPolicy for ThroughputPolicy {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn suitable_queue_size(&self, meta: &TaskMeta, stats: Option<&StatsResult>) -> usize {
        let Some(s) = stats else {
            return self.max_queue_size;
        };
        let drained = s.throughput_per_second * meta.upstream_timeout_ms as f64 / 1_000.0;
        if !drained.is_finite() {
            return 1;
        }
        (drained.floor() as usize).clamp(1, self.max_queue_size.max(1))
    }

    fn could_commit(&self, meta: &TaskMeta, stats: Option<&StatsResult>, load: &ExecutorLoad) -> bool {
        load.queued < self.suitable_queue_size(meta, stats) && within_timeout(meta, stats)
    }
}
