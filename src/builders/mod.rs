//! Builders to construct executors from configuration.

pub mod pool_builder;

pub use pool_builder::{build_adaptive_service, build_pools};
