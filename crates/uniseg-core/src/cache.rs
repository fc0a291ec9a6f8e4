//! A small least-recently-used cache.
//!
//! Used by adapters to memoize message fetches (e.g. the quoted message of
//! a reply) so that a burst of replies to the same message hits the API
//! once. Not thread-safe on its own; wrap it in a mutex.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;

use tracing::trace;

/// Default number of entries kept by adapters.
pub const DEFAULT_CAPACITY: usize = 20;

/// Bounded map evicting the least recently used entry.
#[derive(Debug, Clone)]
pub struct LruCache<K, V> {
    entries: HashMap<K, V>,
    order: VecDeque<K>,
    capacity: usize,
}

impl<K: Eq + Hash + Clone, V: Clone> LruCache<K, V> {
    /// Creates a cache holding at most `capacity` entries (minimum 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns a clone of the value and marks it most recently used.
    pub fn get(&mut self, key: &K) -> Option<V> {
        let value = self.entries.get(key)?.clone();
        self.touch(key);
        Some(value)
    }

    /// Returns true if `key` is cached, without touching it.
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Inserts or replaces a value, evicting the oldest entry when full.
    pub fn put(&mut self, key: K, value: V) {
        if self.entries.insert(key.clone(), value).is_some() {
            self.touch(&key);
            return;
        }
        self.order.push_back(key);
        while self.entries.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&oldest);
            trace!("Evicted least recently used entry");
        }
    }

    /// Removes an entry.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let value = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(value)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    fn touch(&mut self, key: &K) {
        if let Some(index) = self.order.iter().position(|k| k == key) {
            if let Some(k) = self.order.remove(index) {
                self.order.push_back(k);
            }
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for LruCache<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eviction_order() {
        let mut cache = LruCache::new(2);
        cache.put("a", 1);
        cache.put("b", 2);
        assert_eq!(cache.get(&"a"), Some(1));
        cache.put("c", 3);
        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_replace_refreshes() {
        let mut cache = LruCache::new(2);
        cache.put(1, "x");
        cache.put(2, "y");
        cache.put(1, "z");
        cache.put(3, "w");
        assert_eq!(cache.get(&1), Some("z"));
        assert_eq!(cache.get(&2), None);
    }

    #[test]
    fn test_remove_and_default_capacity() {
        let mut cache: LruCache<u32, u32> = LruCache::default();
        assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
        cache.put(1, 1);
        assert_eq!(cache.remove(&1), Some(1));
        assert!(cache.is_empty());
        assert_eq!(LruCache::<u8, u8>::new(0).capacity(), 1);
    }
}
