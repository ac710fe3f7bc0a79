//! Average-latency and throughput statistics over a [`LeapArray`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::leap_array::{LeapArray, LeapArrayListener, LeapBucket, WindowWrap};
use crate::config::WindowConfig;
use crate::core::HookFailure;
use crate::util::now_ms;

/// Per-bucket counters: completed task count and summed latency.
#[derive(Debug, Default)]
pub struct AvgStatsEntry {
    count: AtomicU64,
    rt_sum: AtomicU64,
}

impl AvgStatsEntry {
    /// Record one sample of `rt_ms` milliseconds.
    pub fn add(&self, rt_ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.rt_sum.fetch_add(rt_ms, Ordering::Relaxed);
    }

    /// Samples recorded in this bucket.
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of recorded latencies in milliseconds.
    pub fn rt_sum(&self) -> u64 {
        self.rt_sum.load(Ordering::Relaxed)
    }
}

impl LeapBucket for AvgStatsEntry {
    fn new_empty(_window_start: u64) -> Self {
        Self::default()
    }

    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.rt_sum.store(0, Ordering::Relaxed);
    }
}

/// Aggregate over the non-empty buckets of a window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsResult {
    /// Samples across all non-empty buckets.
    pub total_count: u64,
    /// Samples per second over the time covered by non-empty buckets.
    pub throughput_per_second: f64,
    /// Mean latency in milliseconds.
    pub avg_latency_ms: f64,
}

/// Sum the non-empty buckets valid at `t`. `None` if every bucket is empty.
#[allow(clippy::cast_precision_loss)]
pub fn aggregate<ID>(array: &LeapArray<AvgStatsEntry, ID>, t: u64) -> Option<StatsResult>
where
    ID: fmt::Debug + Send + Sync,
{
    let (mut count, mut rt_sum, mut buckets) = (0_u64, 0_u64, 0_u64);
    for window in array.list_at(t) {
        let c = window.value().count();
        if c == 0 {
            continue;
        }
        count += c;
        rt_sum = rt_sum.saturating_add(window.value().rt_sum());
        buckets += 1;
    }
    if count == 0 {
        return None;
    }
    let covered_ms = buckets * array.window_length_ms();
    Some(StatsResult {
        total_count: count,
        throughput_per_second: count as f64 / covered_ms as f64 * 1_000.0,
        avg_latency_ms: rt_sum as f64 / count as f64,
    })
}

/// Keeps the last non-empty aggregate alive across bucket rotation.
struct LatestValid {
    latest: Arc<RwLock<Option<StatsResult>>>,
}

impl<ID: fmt::Debug + Send + Sync> LeapArrayListener<AvgStatsEntry, ID> for LatestValid {
    fn on_bucket_deprecated(
        &self,
        _id: &ID,
        array: &LeapArray<AvgStatsEntry, ID>,
        doomed: &WindowWrap<AvgStatsEntry>,
    ) -> Result<(), HookFailure> {
        let end = doomed.window_start() + doomed.window_length_ms() - 1;
        if let Some(result) = aggregate(array, end) {
            *self.latest.write() = Some(result);
        }
        Ok(())
    }
}

/// Sliding-window latency statistics for one key.
///
/// Once any data has been seen, [`AvgStatsWindow::calculate_stats_result_at`]
/// never reports "no data": when every live bucket is empty it falls back to
/// the last valid aggregate.
pub struct AvgStatsWindow<ID> {
    array: LeapArray<AvgStatsEntry, ID>,
    latest_valid: Arc<RwLock<Option<StatsResult>>>,
}

impl<ID: fmt::Debug + Send + Sync + 'static> AvgStatsWindow<ID> {
    /// Empty statistics window for `id`.
    pub fn new(id: ID, config: &WindowConfig) -> Self {
        let array = LeapArray::new(id, config);
        let latest_valid = Arc::new(RwLock::new(None));
        array.add_listener(Arc::new(LatestValid {
            latest: Arc::clone(&latest_valid),
        }));
        Self {
            array,
            latest_valid,
        }
    }

    /// Record a sample of `rt_ms` in the current bucket.
    pub fn record(&self, rt_ms: u64) {
        self.record_at(now_ms(), rt_ms);
    }

    /// Record a sample of `rt_ms` in the bucket covering `t`.
    pub fn record_at(&self, t: u64, rt_ms: u64) {
        self.array.current_window_at(t).value().add(rt_ms);
    }

    /// Aggregate at the current time.
    pub fn calculate_stats_result(&self) -> Option<StatsResult> {
        self.calculate_stats_result_at(now_ms())
    }

    /// Aggregate the buckets valid at `t`, or the last valid aggregate if they
    /// are all empty.
    pub fn calculate_stats_result_at(&self, t: u64) -> Option<StatsResult> {
        match aggregate(&self.array, t) {
            Some(result) => {
                *self.latest_valid.write() = Some(result);
                Some(result)
            }
            None => *self.latest_valid.read(),
        }
    }

    /// Last non-empty aggregate, if any.
    pub fn last_valid(&self) -> Option<StatsResult> {
        *self.latest_valid.read()
    }

    /// Underlying bucket ring.
    pub const fn array(&self) -> &LeapArray<AvgStatsEntry, ID> {
        &self.array
    }
}

impl<ID: fmt::Debug> fmt::Debug for AvgStatsWindow<ID> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvgStatsWindow")
            .field("array", &self.array)
            .field("latest_valid", &*self.latest_valid.read())
            .finish()
    }
}
