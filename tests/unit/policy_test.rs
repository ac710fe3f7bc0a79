//! Tests for capacity policies and the keyed initializer

use adaptive_pool::adaptive::{
    CapacityPolicy, ExecutorLoad, KeyedInitializer, StaticPolicy, ThroughputPolicy,
};
use adaptive_pool::core::TaskMeta;
use adaptive_pool::stats::StatsResult;

fn observed(avg_latency_ms: f64) -> StatsResult {
    StatsResult {
        total_count: 100,
        throughput_per_second: 40.0,
        avg_latency_ms,
    }
}

#[test]
fn test_static_policy_without_stats_only_checks_queue() {
    let policy = StaticPolicy::new(3);
    let meta = TaskMeta::new("db").with_upstream_timeout_ms(1);
    assert!(policy.could_commit(&meta, None, &ExecutorLoad { queued: 2 }));
    assert!(!policy.could_commit(&meta, None, &ExecutorLoad { queued: 3 }));
}

#[test]
fn test_static_policy_fails_closed_on_slow_category() {
    let policy = StaticPolicy::default();
    let meta = TaskMeta::new("db").with_upstream_timeout_ms(250);
    assert!(!policy.could_commit(&meta, Some(&observed(251.0)), &ExecutorLoad::default()));
    assert!(policy.could_commit(&meta, Some(&observed(249.0)), &ExecutorLoad::default()));
}

#[test]
fn test_throughput_policy_tracks_upstream_timeout() {
    let policy = ThroughputPolicy::new(1_000);
    let stats = observed(20.0);
    // 40 tasks/s for 0.5 s
    let short = TaskMeta::new("db").with_upstream_timeout_ms(500);
    // 40 tasks/s for 5 s
    let long = TaskMeta::new("db").with_upstream_timeout_ms(5_000);
    assert_eq!(policy.suitable_queue_size(&short, Some(&stats)), 20);
    assert_eq!(policy.suitable_queue_size(&long, Some(&stats)), 200);
    assert!(policy.could_commit(&long, Some(&stats), &ExecutorLoad { queued: 100 }));
    assert!(!policy.could_commit(&short, Some(&stats), &ExecutorLoad { queued: 100 }));
}

#[test]
fn test_keyed_initializer_keys() {
    let cache: KeyedInitializer<String, usize> = KeyedInitializer::new();
    cache.init_once_and_get("a", str::len);
    cache.init_once_and_get("bcd", str::len);
    let mut keys = cache.keys();
    keys.sort();
    assert_eq!(keys, vec!["a".to_string(), "bcd".into()]);
    assert_eq!(cache.get("bcd").map(|v| *v), Some(3));
    assert_eq!(cache.len(), 2);
}
