//! Builders to construct pools and the adaptive service from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::info;

use crate::adaptive::{
    build_adaptive_pool, AdaptiveExecutorService, CapacityPolicy, CategorySelector, CategoryStats,
    StaticPolicy,
};
use crate::config::ExecutorSetConfig;
use crate::core::{AppResult, Executor, ExtendedPool, Task};
use crate::infra::queue::BlockingQueue;

/// Build one plain [`ExtendedPool`] per configured pool, named after its key.
///
/// # Errors
///
/// Fails if the configuration is invalid or a pool cannot be built.
pub fn build_pools(cfg: &ExecutorSetConfig) -> AppResult<HashMap<String, Arc<ExtendedPool>>> {
    cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let pool = ExtendedPool::builder(pool_cfg)
            .with_name(name.clone())
            .build()
            .with_context(|| format!("building pool `{name}`"))?;
        pools.insert(name.clone(), Arc::new(pool));
    }
    Ok(pools)
}

/// Build adaptive pools sharing one spare queue and wire them into an
/// [`AdaptiveExecutorService`].
///
/// Each pool serves the category of its own name plus every category routed
/// to it; `default_pool` catches the rest. Without `policy`, a
/// [`StaticPolicy`] sized by `policy_queue_size` is used.
///
/// # Errors
///
/// Fails if the configuration is invalid or any adaptive pool is rejected
/// (for example `core_pool_size == max_pool_size`).
pub fn build_adaptive_service(
    cfg: &ExecutorSetConfig,
    policy: Option<Arc<dyn CapacityPolicy>>,
) -> AppResult<AdaptiveExecutorService> {
    cfg.validate().map_err(|e| anyhow!("config invalid: {e}"))?;

    let spare: Arc<dyn BlockingQueue<Task>> = cfg.spare_queue.build();
    let mut pools: HashMap<&str, Arc<dyn Executor>> = HashMap::with_capacity(cfg.pools.len());
    for (name, pool_cfg) in &cfg.pools {
        let pool = build_adaptive_pool(name, pool_cfg, Arc::clone(&spare))
            .with_context(|| format!("building adaptive pool `{name}`"))?;
        pools.insert(name.as_str(), Arc::new(pool));
    }

    let mut selector = CategorySelector::new();
    for (name, pool) in &pools {
        selector = selector.with_route(*name, Arc::clone(pool));
    }
    for (category, target) in &cfg.routes {
        let pool = pools
            .get(target.as_str())
            .ok_or_else(|| anyhow!("route `{category}` targets unknown pool `{target}`"))?;
        selector = selector.with_route(category.clone(), Arc::clone(pool));
    }
    if let Some(default) = &cfg.default_pool {
        let pool = pools
            .get(default.as_str())
            .ok_or_else(|| anyhow!("default_pool `{default}` is not defined"))?;
        selector = selector.with_fallback(Arc::clone(pool));
    }

    let policy = policy.unwrap_or_else(|| Arc::new(StaticPolicy::new(cfg.policy_queue_size)));
    info!(
        pools = cfg.pools.len(),
        routes = cfg.routes.len(),
        policy = ?policy,
        "adaptive service initialized"
    );

    let stats = Arc::new(CategoryStats::new(cfg.window));
    Ok(AdaptiveExecutorService::new(Arc::new(selector), stats).with_policy(policy))
}
