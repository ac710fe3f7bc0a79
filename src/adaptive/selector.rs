//! Executor selection by task metadata.

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Executor, TaskMeta};

/// Picks the executor a task runs on.
pub trait ExecutorSelector: Send + Sync {
    /// Executor for `meta`, or `None` when the task has nowhere to go.
    fn select(&self, meta: &TaskMeta) -> Option<Arc<dyn Executor>>;

    /// Every distinct executor this selector can return.
    fn executors(&self) -> Vec<Arc<dyn Executor>>;
}

/// Routes by category, with an optional fallback for unknown categories.
#[derive(Default, Clone)]
pub struct CategorySelector {
    routes: HashMap<String, Arc<dyn Executor>>,
    fallback: Option<Arc<dyn Executor>>,
}

impl CategorySelector {
    /// Selector with no routes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Route `category` to `executor`.
    #[must_use]
    pub fn with_route(mut self, category: impl Into<String>, executor: Arc<dyn Executor>) -> Self {
        self.routes.insert(category.into(), executor);
        self
    }

    /// Executor for categories without a route.
    #[must_use]
    pub fn with_fallback(mut self, executor: Arc<dyn Executor>) -> Self {
        self.fallback = Some(executor);
        self
    }

    /// Routed categories.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }
}

fn same_executor(a: &Arc<dyn Executor>, b: &Arc<dyn Executor>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl ExecutorSelector for CategorySelector {
    fn select(&self, meta: &TaskMeta) -> Option<Arc<dyn Executor>> {
        self.routes
            .get(&meta.category)
            .or(self.fallback.as_ref())
            .cloned()
    }

    fn executors(&self) -> Vec<Arc<dyn Executor>> {
        let mut out: Vec<Arc<dyn Executor>> = Vec::new();
        for executor in self.routes.values().chain(self.fallback.iter()) {
            if !out.iter().any(|seen| same_executor(seen, executor)) {
                out.push(Arc::clone(executor));
            }
        }
        out
    }
}

impl std::fmt::Debug for CategorySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CategorySelector")
            .field("routes", &self.routes.keys().collect::<Vec<_>>())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}
