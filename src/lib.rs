//! # Adaptive Pool
//!
//! Worker-pool executors with pluggable admission, a two-tier overflow queue
//! and per-category latency statistics that drive adaptive admission.
//!
//! ## Core Problem Solved
//!
//! A fixed-size pool in front of a slow dependency either queues work until
//! the caller's own deadline has long passed, or rejects work it could have
//! absorbed. This crate lets pools:
//!
//! - **Grow eagerly**: add workers while queued tasks outnumber them, instead of
//!   only once the queue is full
//! - **Overflow into a shared spare**: a bounded primary queue spills into a
//!   spare queue drained by every pool sharing it
//! - **Track latency per category**: a sliding-window ring of time buckets
//!   records task count and latency with no lock on the hot path
//! - **Admit by policy**: a [`CapacityPolicy`](adaptive::CapacityPolicy) decides
//!   whether a category may commit more work given its observed latency and
//!   the caller's upstream timeout
//!
//! ## ExtendedPool - Thread Pool with Pluggable Admission
//!
//! ```rust
//! use adaptive_pool::config::PoolConfig;
//! use adaptive_pool::core::{Executor, ExtendedPool, TaskMeta};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let pool = ExtendedPool::new(&PoolConfig::new(2, 8))?;
//! let handle = pool.submit(TaskMeta::new("calc"), || 6 * 7)?;
//! assert_eq!(handle.join()?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## AdaptiveExecutorService - Category Routing
//!
//! ```rust,ignore
//! use adaptive_pool::builders::build_adaptive_service;
//! use adaptive_pool::config::ExecutorSetConfig;
//! use adaptive_pool::core::{submit, TaskMeta};
//!
//! let cfg = ExecutorSetConfig::from_json_str(r#"{
//!     "pools": {"db": {"core_pool_size": 2, "max_pool_size": 8}},
//!     "default_pool": "db"
//! }"#)?;
//! let service = build_adaptive_service(&cfg, None)?;
//! let handle = submit(&service, TaskMeta::new("db").with_upstream_timeout_ms(500), query)?;
//! let stats = service.stats().snapshot("db");
//! ```
//!
//! For complete examples, see:
//! - `tests/strategy_test.rs` - eager versus original growth
//! - `tests/adaptive_test.rs` - end-to-end routing, statistics and admission

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core execution abstractions: tasks, executors, strategies and pools.
pub mod core;
/// Configuration models for pools, queues and statistics windows.
pub mod config;
/// Builders to construct pools and services from configuration.
pub mod builders;
/// Queue backends.
pub mod infra;
/// Sliding-window statistics.
pub mod stats;
/// Category routing, statistics listener and capacity policies.
pub mod adaptive;
/// Shared utilities.
pub mod util;
