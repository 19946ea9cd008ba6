//! A small bounded least-recently-used map.
//!
//! Used to memoize pure functions (fuzzy scores, translations). Entries
//! are never invalidated, only evicted once the cache is full, so an
//! eviction can cost a recomputation but never change a result.

use std::{
    borrow::Borrow,
    hash::Hash,
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard, PoisonError},
};

use lru::LruCache;

/// Thread-safe LRU cache with a fixed capacity.
///
/// # Examples
///
/// ```
/// use clausemap::cache::BoundedCache;
///
/// let cache = BoundedCache::new(2);
/// cache.insert("a".to_string(), 1);
/// cache.insert("b".to_string(), 2);
/// assert_eq!(cache.get("a"), Some(1));
///
/// // "b" is now the least recently used entry.
/// cache.insert("c".to_string(), 3);
/// assert_eq!(cache.get("b"), None);
/// assert_eq!(cache.len(), 2);
/// ```
pub struct BoundedCache<K: Hash + Eq, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// A zero capacity is treated as one.
    pub fn new(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a key, marking it as most recently used.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.lock().get(key).cloned()
    }

    /// Insert or refresh an entry, evicting the least recently used one
    /// when the cache is full.
    pub fn insert(&self, key: K, value: V) {
        self.lock().put(key, value);
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<K, V>> {
        // Entries are immutable memoized values; a panic elsewhere cannot
        // leave them half-written.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_missing_returns_none() {
        let cache: BoundedCache<String, u8> = BoundedCache::new(4);
        assert_eq!(cache.get("nope"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn evicts_least_recently_used() {
        let cache = BoundedCache::new(3);
        cache.insert(1, "one");
        cache.insert(2, "two");
        cache.insert(3, "three");

        // Touch 1 so that 2 becomes the oldest.
        assert_eq!(cache.get(&1), Some("one"));
        cache.insert(4, "four");

        assert_eq!(cache.get(&2), None);
        assert_eq!(cache.get(&1), Some("one"));
        assert_eq!(cache.get(&3), Some("three"));
        assert_eq!(cache.get(&4), Some("four"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn reinsert_updates_value_without_growing() {
        let cache = BoundedCache::new(2);
        cache.insert("k", 1);
        cache.insert("k", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn zero_capacity_holds_one_entry() {
        let cache = BoundedCache::new(0);
        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("b"), Some(2));
    }

    #[test]
    fn tuple_keys_work() {
        let cache = BoundedCache::new(8);
        cache.insert(("a".to_string(), "b".to_string()), 42u8);
        assert_eq!(cache.get(&("a".to_string(), "b".to_string())), Some(42));
        assert_eq!(cache.get(&("b".to_string(), "a".to_string())), None);
    }
}
