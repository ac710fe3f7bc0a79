//! Per-category latency statistics, fed by a task listener.

use std::sync::Arc;
use std::time::Instant;

use super::listener::{Attachment, TaskListener};
use super::memo::KeyedInitializer;
use crate::config::WindowConfig;
use crate::core::{HookFailure, TaskFailure, TaskMeta};
use crate::stats::{AvgStatsWindow, StatsResult};

/// One [`AvgStatsWindow`] per task category, created on first use.
///
/// As a [`TaskListener`] it times every task it wraps and records the elapsed
/// milliseconds, panicking tasks included.
#[derive(Debug)]
pub struct CategoryStats {
    config: WindowConfig,
    windows: KeyedInitializer<String, AvgStatsWindow<String>>,
}

impl CategoryStats {
    /// Empty statistics using `config` for every category window.
    #[must_use]
    pub fn new(config: WindowConfig) -> Self {
        Self {
            config,
            windows: KeyedInitializer::new(),
        }
    }

    /// Window configuration shared by all categories.
    #[must_use]
    pub const fn config(&self) -> &WindowConfig {
        &self.config
    }

    fn window(&self, category: &str) -> Arc<AvgStatsWindow<String>> {
        self.windows
            .init_once_and_get(category, |c| AvgStatsWindow::new(c.to_owned(), &self.config))
    }

    /// Record one sample of `rt_ms` for `category` now.
    pub fn record(&self, category: &str, rt_ms: u64) {
        self.window(category).record(rt_ms);
    }

    /// Record one sample of `rt_ms` for `category` at time `t`.
    pub fn record_at(&self, category: &str, t: u64, rt_ms: u64) {
        self.window(category).record_at(t, rt_ms);
    }

    /// Current aggregate for `category`, `None` if it never recorded anything.
    #[must_use]
    pub fn snapshot(&self, category: &str) -> Option<StatsResult> {
        self.windows
            .get(category)
            .and_then(|w| w.calculate_stats_result())
    }

    /// Aggregate for `category` at time `t`.
    #[must_use]
    pub fn snapshot_at(&self, category: &str, t: u64) -> Option<StatsResult> {
        self.windows
            .get(category)
            .and_then(|w| w.calculate_stats_result_at(t))
    }

    /// Last non-empty aggregate for `category`, without recomputing.
    #[must_use]
    pub fn last_rotated_snapshot(&self, category: &str) -> Option<StatsResult> {
        self.windows.get(category).and_then(|w| w.last_valid())
    }

    /// Categories seen so far.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.windows.keys()
    }
}

impl TaskListener for CategoryStats {
    fn before_execute(&self, _meta: &TaskMeta) -> Attachment {
        Ok(Box::new(Instant::now()))
    }

    fn after_execute(
        &self,
        meta: &TaskMeta,
        _failure: Option<&TaskFailure>,
        attachment: Attachment,
    ) -> Result<(), HookFailure> {
        let started = attachment?
            .downcast::<Instant>()
            .map_err(|_| HookFailure::Failed("attachment is not a start instant".into()))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.record(&meta.category, elapsed_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adaptive::ListenableTask;
    use crate::config::IntervalUnit;
    use crate::core::Task;
    use std::thread;
    use std::time::Duration;

    fn stats() -> CategoryStats {
        CategoryStats::new(WindowConfig::new(4, 400, IntervalUnit::Milliseconds).unwrap())
    }

    #[test]
    fn test_categories_are_tracked_separately() {
        let s = stats();
        s.record_at("db", 1_000, 10);
        s.record_at("db", 1_010, 30);
        s.record_at("cache", 1_020, 2);
        assert_eq!(s.snapshot_at("db", 1_050).unwrap().total_count, 2);
        assert_eq!(s.snapshot_at("cache", 1_050).unwrap().total_count, 1);
        assert_eq!(s.snapshot_at("unknown", 1_050), None);
        let mut cats = s.categories();
        cats.sort();
        assert_eq!(cats, vec!["cache".to_string(), "db".into()]);
    }

    #[test]
    fn test_listener_times_task() {
        let s = Arc::new(stats());
        let task = Task::new(TaskMeta::new("sleepy"), || thread::sleep(Duration::from_millis(20)));
        ListenableTask::new(task, vec![s.clone()]).run();
        let r = s.snapshot("sleepy").unwrap();
        assert_eq!(r.total_count, 1);
        assert!(r.avg_latency_ms >= 20.0);
    }

    #[test]
    fn test_foreign_attachment_is_rejected() {
        let s = stats();
        let meta = TaskMeta::new("x");
        let err = s.after_execute(&meta, None, Ok(Box::new(1_u8))).unwrap_err();
        assert!(matches!(err, HookFailure::Failed(_)));
        assert!(s.categories().is_empty());
    }
}
