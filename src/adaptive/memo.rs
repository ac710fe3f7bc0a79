//! Create-once-per-key cache.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::RwLock;

/// Keyed cache whose initializer runs at most once per key (or once per
/// expiry, for [`KeyedInitializer::init_and_get`]).
///
/// Lookups of existing keys only take the read lock; the initializer runs under
/// the write lock.
#[derive(Debug)]
pub struct KeyedInitializer<K, V> {
    entries: RwLock<HashMap<K, Arc<V>>>,
}

impl<K, V> Default for KeyedInitializer<K, V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V> KeyedInitializer<K, V> {
    /// Empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Value for `key`, creating it with `init` on first use.
    pub fn init_once_and_get<Q>(&self, key: &Q, init: impl FnOnce(&Q) -> V) -> Arc<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(value) = self.entries.read().get(key) {
            return Arc::clone(value);
        }
        let mut entries = self.entries.write();
        if let Some(value) = entries.get(key) {
            return Arc::clone(value);
        }
        let value = Arc::new(init(key));
        entries.insert(key.to_owned(), Arc::clone(&value));
        value
    }

    /// Fallible [`init_once_and_get`](Self::init_once_and_get). A failed
    /// initializer leaves the key absent.
    ///
    /// # Errors
    ///
    /// Propagates the initializer's error.
    pub fn try_init_once_and_get<Q, E>(
        &self,
        key: &Q,
        init: impl FnOnce(&Q) -> Result<V, E>,
    ) -> Result<Arc<V>, E>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(value) = self.entries.read().get(key) {
            return Ok(Arc::clone(value));
        }
        let mut entries = self.entries.write();
        if let Some(value) = entries.get(key) {
            return Ok(Arc::clone(value));
        }
        let value = Arc::new(init(key)?);
        entries.insert(key.to_owned(), Arc::clone(&value));
        Ok(value)
    }

    /// Value for `key`, re-created with `init` when missing or when `expired`
    /// returns true for the current value.
    pub fn init_and_get<Q>(
        &self,
        key: &Q,
        expired: impl Fn(&V) -> bool,
        init: impl FnOnce(&Q) -> V,
    ) -> Arc<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ToOwned<Owned = K> + ?Sized,
    {
        if let Some(value) = self.entries.read().get(key) {
            if !expired(value) {
                return Arc::clone(value);
            }
        }
        let mut entries = self.entries.write();
        if let Some(value) = entries.get(key) {
            if !expired(value) {
                return Arc::clone(value);
            }
        }
        let value = Arc::new(init(key));
        entries.insert(key.to_owned(), Arc::clone(&value));
        value
    }

    /// Existing value for `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.read().get(key).cloned()
    }

    /// Keys initialized so far.
    pub fn keys(&self) -> Vec<K> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of initialized keys.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether nothing has been initialized.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn test_init_runs_once_under_contention() {
        let cache: Arc<KeyedInitializer<String, usize>> = Arc::new(KeyedInitializer::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let workers: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                thread::spawn(move || {
                    *cache.init_once_and_get("k", |_| {
                        calls.fetch_add(1, Ordering::SeqCst);
                        42
                    })
                })
            })
            .collect();
        for w in workers {
            assert_eq!(w.join().unwrap(), 42);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.keys(), vec!["k".to_string()]);
    }

    #[test]
    fn test_expired_value_is_replaced() {
        let cache: KeyedInitializer<String, u32> = KeyedInitializer::new();
        assert_eq!(*cache.init_and_get("gen", |_| false, |_| 1), 1);
        assert_eq!(*cache.init_and_get("gen", |_| false, |_| 2), 1);
        assert_eq!(*cache.init_and_get("gen", |v| *v < 2, |_| 2), 2);
        assert_eq!(cache.get("gen").map(|v| *v), Some(2));
    }

    #[test]
    fn test_failed_init_leaves_key_absent() {
        let cache: KeyedInitializer<String, u32> = KeyedInitializer::new();
        let err = cache.try_init_once_and_get("x", |_| Err::<u32, _>("nope"));
        assert_eq!(err.unwrap_err(), "nope");
        assert!(cache.is_empty());
        assert_eq!(*cache.try_init_once_and_get("x", |_| Ok::<_, ()>(5)).unwrap(), 5);
    }
}
