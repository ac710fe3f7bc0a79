//! Pools that overflow into a shared spare queue.

use std::sync::Arc;

use crate::config::PoolConfig;
use crate::core::{ConfigError, ExtendedPool, Task};
use crate::infra::queue::{BlockingQueue, DualQueue, PollSplit};

/// Build a pool whose queue is `config.queue` in front of the shared `spare`.
///
/// Workers alternate short poll slices between the two tiers, so a spare
/// shared by several pools is drained by all of them. The strategy comes from
/// the config and defaults to eager growth.
///
/// # Errors
///
/// Returns `ConfigError::InvalidArgument` when the config is invalid, when
/// `core_pool_size` is zero, or when `core_pool_size == max_pool_size` (the
/// pool would have no room to grow into).
pub fn build_adaptive_pool(
    name: &str,
    config: &PoolConfig,
    spare: Arc<dyn BlockingQueue<Task>>,
) -> Result<ExtendedPool, ConfigError> {
    if config.core_pool_size == 0 {
        return Err(ConfigError::InvalidArgument(format!(
            "adaptive pool `{name}` needs core_pool_size >= 1"
        )));
    }
    if config.core_pool_size == config.max_pool_size {
        return Err(ConfigError::InvalidArgument(format!(
            "adaptive pool `{name}` needs max_pool_size > core_pool_size ({})",
            config.core_pool_size
        )));
    }
    let queue = DualQueue::new(config.queue.build(), spare).with_poll_split(PollSplit::default());
    ExtendedPool::builder(config)
        .with_name(name)
        .with_queue(Arc::new(queue))
        .build()
}
