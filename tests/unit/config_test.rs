//! Tests for configuration validation

use adaptive_pool::config::{
    ExecutorSetConfig, IntervalUnit, PoolConfig, QueueConfig, StrategyKind, WindowConfig,
};
use adaptive_pool::core::{ConfigError, ExtendedPool};

#[test]
fn test_pool_config_validation() {
    let valid = PoolConfig::new(2, 8);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_pool_config_invalid_max_size() {
    let invalid = PoolConfig::new(0, 0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_core_above_max() {
    let invalid = PoolConfig::new(5, 4);
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("core_pool_size"), "{err}");
}

#[test]
fn test_pool_config_zero_stack() {
    let invalid = PoolConfig::new(1, 2).with_thread_stack_size(0);
    assert!(invalid.validate().is_err());
}

#[test]
fn test_pool_config_blank_thread_prefix() {
    let invalid = PoolConfig::new(1, 2).with_thread_name_prefix(" \t");
    let err = ExtendedPool::new(&invalid).unwrap_err();
    assert!(
        matches!(&err, ConfigError::InvalidArgument(msg) if msg.contains("thread_name_prefix")),
        "{err}"
    );
}

#[test]
fn test_pool_config_from_json_defaults() {
    let cfg: PoolConfig = serde_json::from_str(r#"{"core_pool_size": 3, "max_pool_size": 6}"#).unwrap();
    assert_eq!(cfg.keep_alive_ms, 60_000);
    assert_eq!(cfg.strategy, StrategyKind::Eager);
    assert_eq!(cfg.queue, QueueConfig::default());
    assert_eq!(cfg.thread_name_prefix, "pool-");
    assert!(!cfg.daemon);
}

#[test]
fn test_window_config_from_json() {
    let cfg: WindowConfig =
        serde_json::from_str(r#"{"sample_count": 2, "interval": 1, "unit": "seconds"}"#).unwrap();
    assert_eq!(cfg, WindowConfig::new(2, 1, IntervalUnit::Seconds).unwrap());
    assert_eq!(cfg.window_length_ms(), 500);
}

#[test]
fn test_executor_set_rejects_unknown_route() {
    let err = ExecutorSetConfig::from_json_str(
        r#"{"pools": {"db": {"core_pool_size": 1, "max_pool_size": 2}}, "routes": {"disk": "io"}}"#,
    )
    .unwrap_err();
    assert!(err.contains("unknown pool `io`"), "{err}");
}

#[test]
fn test_executor_set_rejects_unknown_default() {
    let err = ExecutorSetConfig::from_json_str(
        r#"{"pools": {"db": {"core_pool_size": 1, "max_pool_size": 2}}, "default_pool": "io"}"#,
    )
    .unwrap_err();
    assert!(err.contains("default_pool"), "{err}");
}

#[test]
fn test_executor_set_rejects_empty_pools() {
    assert!(ExecutorSetConfig::from_json_str(r#"{"pools": {}}"#).is_err());
}

#[test]
fn test_executor_set_rejects_bad_window() {
    let err = ExecutorSetConfig::from_json_str(
        r#"{"pools": {"db": {"core_pool_size": 1, "max_pool_size": 2}},
            "window": {"sample_count": 0, "interval": 1}}"#,
    )
    .unwrap_err();
    assert!(err.starts_with("parse error"), "{err}");
}

#[test]
fn test_executor_set_defaults() {
    let cfg = ExecutorSetConfig::from_json_str(
        r#"{"pools": {"db": {"core_pool_size": 1, "max_pool_size": 2}}}"#,
    )
    .unwrap();
    assert_eq!(cfg.window, WindowConfig::default());
    assert_eq!(cfg.spare_queue, QueueConfig::unbounded());
    assert_eq!(cfg.policy_queue_size, 1_000);
    assert!(cfg.routes.is_empty());
    assert!(cfg.default_pool.is_none());
}
