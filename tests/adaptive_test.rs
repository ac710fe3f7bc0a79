//! End-to-end tests for the adaptive executor service
//!
//! These tests validate:
//! - Building pools and the service from JSON configuration
//! - Routing by category, explicit routes and the default pool
//! - Per-category latency statistics fed by executed tasks
//! - Rejections: invalid metadata, missing route, policy decline
//! - Injected capacity policies
//! - Shutdown and termination across all pools

use adaptive_pool::adaptive::{CapacityPolicy, ExecutorLoad, StaticPolicy};
use adaptive_pool::builders::{build_adaptive_service, build_pools};
use adaptive_pool::config::ExecutorSetConfig;
use adaptive_pool::core::{submit, Executor, RejectReason, TaskMeta};
use adaptive_pool::stats::StatsResult;
use adaptive_pool::util::init_tracing;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

fn config() -> ExecutorSetConfig {
    init_tracing();
    ExecutorSetConfig::from_json_str(
        r#"{
            "pools": {
                "db": {"core_pool_size": 1, "max_pool_size": 3, "daemon": true, "thread_name_prefix": "db-"},
                "cpu": {"core_pool_size": 1, "max_pool_size": 2, "daemon": true, "thread_name_prefix": "cpu-"}
            },
            "window": {"sample_count": 4, "interval": 2, "unit": "seconds"},
            "routes": {"disk": "db"},
            "default_pool": "cpu",
            "policy_queue_size": 50
        }"#,
    )
    .unwrap()
}

/// Declines everything.
#[derive(Debug)]
struct Closed;

impl CapacityPolicy for Closed {
    fn suitable_queue_size(&self, _meta: &TaskMeta, _stats: Option<&StatsResult>) -> usize {
        0
    }

    fn could_commit(&self, _meta: &TaskMeta, _stats: Option<&StatsResult>, _load: &ExecutorLoad) -> bool {
        false
    }
}

// ============================================================================
// ROUTING AND STATISTICS
// ============================================================================

#[test]
fn test_tasks_run_and_feed_category_stats() {
    let service = build_adaptive_service(&config(), None).unwrap();

    let handles: Vec<_> = (0..6_u64)
        .map(|i| {
            submit(&service, TaskMeta::new("db"), move || {
                thread::sleep(Duration::from_millis(10));
                i
            })
            .unwrap()
        })
        .collect();
    let sum: u64 = handles
        .into_iter()
        .map(|h| h.join_timeout(Duration::from_secs(5)).unwrap())
        .sum();
    assert_eq!(sum, 15);

    // handles resolve before the statistics hook runs
    service.shutdown();
    assert!(service.await_termination(Duration::from_secs(5)));

    let stats = service.stats().snapshot("db").unwrap();
    assert_eq!(stats.total_count, 6);
    assert!(stats.avg_latency_ms >= 10.0);
    assert!(stats.throughput_per_second > 0.0);
}

#[test]
fn test_routes_and_default_pool() {
    let service = build_adaptive_service(&config(), None).unwrap();

    let db = submit(&service, TaskMeta::new("disk"), || thread::current().name().map(String::from))
        .unwrap();
    let other = submit(&service, TaskMeta::new("unlisted"), || {
        thread::current().name().map(String::from)
    })
    .unwrap();

    let db_thread = db.join_timeout(Duration::from_secs(5)).unwrap().unwrap();
    let other_thread = other.join_timeout(Duration::from_secs(5)).unwrap().unwrap();
    assert!(db_thread.starts_with("db-"), "{db_thread}");
    assert!(other_thread.starts_with("cpu-"), "{other_thread}");
}

// ============================================================================
// REJECTIONS
// ============================================================================

#[test]
fn test_invalid_metadata_is_rejected() {
    let service = build_adaptive_service(&config(), None).unwrap();
    let err = submit(&service, TaskMeta::new("db").with_priority(42), || ()).unwrap_err();
    assert_eq!(err.reason(), RejectReason::InvalidTask);
    let err = submit(&service, TaskMeta::new(""), || ()).unwrap_err();
    assert_eq!(err.reason(), RejectReason::InvalidTask);
}

#[test]
fn test_missing_route_is_rejected() {
    let mut cfg = config();
    cfg.default_pool = None;
    let service = build_adaptive_service(&cfg, None).unwrap();
    let err = submit(&service, TaskMeta::new("unlisted"), || ()).unwrap_err();
    assert_eq!(err.reason(), RejectReason::NoRoute);
    assert!(!service.could_commit(&TaskMeta::new("unlisted")));
}

#[test]
fn test_slow_category_is_declined_within_upstream_timeout() {
    let service = build_adaptive_service(&config(), None).unwrap();
    service.stats().record("db", 800);

    let tight = TaskMeta::new("db").with_upstream_timeout_ms(100);
    let loose = TaskMeta::new("db").with_upstream_timeout_ms(1_000);
    assert!(!service.could_commit(&tight));
    assert!(service.could_commit(&loose));

    let err = submit(&service, tight, || ()).unwrap_err();
    assert_eq!(err.reason(), RejectReason::PolicyDeclined);
    assert!(submit(&service, loose, || ()).is_ok());
}

#[test]
fn test_injected_policy_is_used() {
    let service = build_adaptive_service(&config(), Some(Arc::new(Closed))).unwrap();
    let meta = TaskMeta::new("db");
    assert_eq!(service.calculate_suitable_queue_size(&meta), 0);
    let err = submit(&service, meta, || ()).unwrap_err();
    assert_eq!(err.reason(), RejectReason::PolicyDeclined);
}

#[test]
fn test_default_policy_uses_configured_queue_size() {
    let service = build_adaptive_service(&config(), None).unwrap();
    assert_eq!(service.calculate_suitable_queue_size(&TaskMeta::new("db")), 50);
    let p = StaticPolicy::new(50);
    assert!(!p.could_commit(&TaskMeta::new("db"), None, &ExecutorLoad { queued: 50 }));
}

// ============================================================================
// CONSTRUCTION ERRORS AND LIFECYCLE
// ============================================================================

#[test]
fn test_fixed_size_pool_is_not_adaptive() {
    let cfg = ExecutorSetConfig::from_json_str(
        r#"{"pools": {"fixed": {"core_pool_size": 2, "max_pool_size": 2}}}"#,
    )
    .unwrap();
    let err = build_adaptive_service(&cfg, None).unwrap_err();
    assert!(format!("{err:#}").contains("fixed"));
    // plain pools accept the same config
    let pools = build_pools(&cfg).unwrap();
    assert_eq!(pools["fixed"].name(), "fixed");
}

#[cfg(feature = "tokio-runtime")]
#[tokio::test]
async fn test_join_async_through_service() {
    let service = build_adaptive_service(&config(), None).unwrap();
    let h = submit(&service, TaskMeta::new("db"), || "async").unwrap();
    assert_eq!(h.join_async(Duration::from_secs(5)).await, Ok("async"));
}

#[test]
fn test_shutdown_rejects_and_terminates() {
    let service = build_adaptive_service(&config(), None).unwrap();
    let h = submit(&service, TaskMeta::new("db"), || 1).unwrap();
    assert_eq!(h.join_timeout(Duration::from_secs(5)), Ok(1));

    service.shutdown();
    assert!(service.is_shutdown());
    let err = submit(&service, TaskMeta::new("db"), || 2).unwrap_err();
    assert_eq!(err.reason(), RejectReason::Shutdown);
    assert!(service.await_termination(Duration::from_secs(5)));
    assert!(service.is_terminated());
}
