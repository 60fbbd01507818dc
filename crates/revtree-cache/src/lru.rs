//! LRU (Least Recently Used) cache.
//!
//! Entries live in a dense vector and are chained into a doubly linked
//! recency list by index. A hash map resolves keys to vector slots. Removal
//! swaps the last slot into the hole and patches its neighbours, so the
//! vector never holds vacant slots.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::stats::CacheStats;

const NIL: usize = usize::MAX;

struct Slot<K, V> {
    key: K,
    value: V,
    /// Towards the most recently used end.
    prev: usize,
    /// Towards the least recently used end.
    next: usize,
}

/// A bounded LRU cache with O(1) operations.
///
/// # Example
///
/// ```
/// use revtree_cache::lru::LruCache;
///
/// let mut cache = LruCache::new(2);
/// cache.insert("a", 1);
/// cache.insert("b", 2);
/// assert_eq!(cache.get(&"a"), Some(&1));
///
/// // "b" is now the least recently used entry and gets evicted.
/// cache.insert("c", 3);
/// assert_eq!(cache.get(&"b"), None);
/// ```
pub struct LruCache<K, V> {
    capacity: usize,
    index: HashMap<K, usize>,
    slots: Vec<Slot<K, V>>,
    head: usize,
    tail: usize,
    stats: CacheStats,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Creates a new LRU cache holding at most `capacity` entries.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            index: HashMap::with_capacity(capacity),
            slots: Vec::with_capacity(capacity),
            head: NIL,
            tail: NIL,
            stats: CacheStats::new(),
        }
    }

    /// Returns the current number of entries.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Gets the value for `key` and marks it as most recently used.
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.lookup(key)?;
        self.touch(idx);
        Some(&self.slots[idx].value)
    }

    /// Gets a mutable reference to the value for `key` and marks it as most
    /// recently used.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.lookup(key)?;
        self.touch(idx);
        Some(&mut self.slots[idx].value)
    }

    /// Gets the value for `key` without updating recency or statistics.
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(key).map(|&idx| &self.slots[idx].value)
    }

    /// Checks if the cache contains `key` without updating recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Returns the key that would be evicted next.
    pub fn lru_key(&self) -> Option<&K> {
        (self.tail != NIL).then(|| &self.slots[self.tail].key)
    }

    /// Inserts a key-value pair.
    ///
    /// An existing entry is updated in place and its old value returned. A
    /// new entry evicts the least recently used one when the cache is full.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.stats.record_insert();

        if let Some(&idx) = self.index.get(&key) {
            self.touch(idx);
            return Some(std::mem::replace(&mut self.slots[idx].value, value));
        }

        if self.slots.len() >= self.capacity {
            self.evict_lru();
        }

        let idx = self.slots.len();
        self.slots.push(Slot {
            key: key.clone(),
            value,
            prev: NIL,
            next: NIL,
        });
        self.push_front(idx);
        self.index.insert(key, idx);

        None
    }

    /// Removes an entry, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.index.remove(key)?;
        self.stats.record_removal();
        Some(self.take_slot(idx).value)
    }

    /// Clears all entries. Statistics are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.slots.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Resets statistics.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    fn lookup<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&idx) => {
                self.stats.record_hit();
                Some(idx)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    fn touch(&mut self, idx: usize) {
        if idx != self.head {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn push_front(&mut self, idx: usize) {
        self.slots[idx].prev = NIL;
        self.slots[idx].next = self.head;
        if self.head != NIL {
            self.slots[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);

        if prev == NIL {
            self.head = next;
        } else {
            self.slots[prev].next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.slots[next].prev = prev;
        }
    }

    /// Detaches slot `idx` and fills the hole with the last slot.
    fn take_slot(&mut self, idx: usize) -> Slot<K, V> {
        self.unlink(idx);
        let taken = self.slots.swap_remove(idx);

        if idx < self.slots.len() {
            let (prev, next) = (self.slots[idx].prev, self.slots[idx].next);
            if prev == NIL {
                self.head = idx;
            } else {
                self.slots[prev].next = idx;
            }
            if next == NIL {
                self.tail = idx;
            } else {
                self.slots[next].prev = idx;
            }
            if let Some(moved) = self.index.get_mut(&self.slots[idx].key) {
                *moved = idx;
            }
        }

        taken
    }

    fn evict_lru(&mut self) {
        if self.tail == NIL {
            return;
        }
        let idx = self.tail;
        self.index.remove(&self.slots[idx].key);
        self.take_slot(idx);
        self.stats.record_eviction();
    }
}

impl<K, V> std::fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruCache")
            .field("capacity", &self.capacity)
            .field("len", &self.slots.len())
            .field("stats", &self.stats)
            .finish()
    }
}

/// A thread-safe LRU cache shared between readers.
///
/// Values are cloned out of the lock, so they are usually `Arc`s.
pub struct SharedLruCache<K, V> {
    inner: Mutex<LruCache<K, V>>,
}

impl<K: Hash + Eq + Clone, V: Clone> SharedLruCache<K, V> {
    /// Creates a new shared LRU cache.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Gets a value from the cache.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().get(key).cloned()
    }

    /// Inserts a value into the cache.
    pub fn insert(&self, key: K, value: V) -> Option<V> {
        self.inner.lock().insert(key, value)
    }

    /// Removes a value from the cache.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().remove(key)
    }

    /// Checks membership without updating recency.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.lock().contains(key)
    }

    /// Returns the current size.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Clears the cache.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Gets a snapshot of the cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats().clone()
    }
}

impl<K, V> std::fmt::Debug for SharedLruCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedLruCache")
            .field("inner", &*self.inner.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_basic_operations() {
        let mut cache = LruCache::new(3);

        cache.insert(1u64, "one");
        cache.insert(2, "two");
        cache.insert(3, "three");

        assert_eq!(cache.get(&1), Some(&"one"));
        assert_eq!(cache.get(&2), Some(&"two"));
        assert_eq!(cache.get(&3), Some(&"three"));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_eviction_order() {
        let mut cache = LruCache::new(2);

        cache.insert(1u64, 10);
        cache.insert(2, 20);
        assert_eq!(cache.lru_key(), Some(&1));

        cache.insert(3, 30);
        assert!(!cache.contains(&1));
        assert_eq!(cache.peek(&2), Some(&20));
        assert_eq!(cache.peek(&3), Some(&30));
        assert_eq!(cache.stats().evictions(), 1);
    }

    #[test]
    fn test_access_updates_recency() {
        let mut cache = LruCache::new(2);

        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.get(&"a");
        cache.insert("c", 3);

        assert!(cache.contains(&"a"));
        assert!(!cache.contains(&"b"));
    }

    #[test]
    fn test_peek_does_not_update_recency() {
        let mut cache = LruCache::new(2);

        cache.insert("a", 1);
        cache.insert("b", 2);
        assert_eq!(cache.peek(&"a"), Some(&1));
        cache.insert("c", 3);

        assert!(!cache.contains(&"a"));
        assert_eq!(cache.stats().hits(), 0);
    }

    #[test]
    fn test_update_existing() {
        let mut cache = LruCache::new(2);

        cache.insert("a", 1);
        let old = cache.insert("a", 10);

        assert_eq!(old, Some(1));
        assert_eq!(cache.get(&"a"), Some(&10));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_mut() {
        let mut cache = LruCache::new(2);
        cache.insert("a", vec![1]);
        if let Some(v) = cache.get_mut(&"a") {
            v.push(2);
        }
        assert_eq!(cache.peek(&"a"), Some(&vec![1, 2]));
    }

    #[test]
    fn test_remove_patches_moved_slot() {
        let mut cache = LruCache::new(4);
        for i in 0..4u64 {
            cache.insert(i, i * 10);
        }

        // Slot 0 is removed; the last slot is swapped into its place.
        assert_eq!(cache.remove(&0), Some(0));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.get(&3), Some(&30));
        assert_eq!(cache.lru_key(), Some(&1));

        cache.insert(4, 40);
        cache.insert(5, 50);
        assert!(!cache.contains(&1));
        assert_eq!(cache.peek(&2), Some(&20));
        assert_eq!(cache.remove(&9), None);
    }

    #[test]
    fn test_clear() {
        let mut cache = LruCache::new(3);

        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.get(&"a"), None);
        assert_eq!(cache.lru_key(), None);
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut cache = LruCache::new(0);
        cache.insert(1u64, 1);
        cache.insert(2, 2);
        assert_eq!(cache.capacity(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(&2));
    }

    #[test]
    fn test_statistics() {
        let mut cache = LruCache::new(2);

        cache.insert("a", 1);
        cache.get(&"a");
        cache.get(&"b");
        cache.insert("b", 2);
        cache.insert("c", 3);

        let stats = cache.stats();
        assert_eq!(stats.hits(), 1);
        assert_eq!(stats.misses(), 1);
        assert_eq!(stats.evictions(), 1);
        assert_eq!(stats.inserts(), 3);
    }

    #[test]
    fn test_bounded_under_churn() {
        let mut cache = LruCache::new(8);
        for i in 0..1000u64 {
            cache.insert(i % 37, i);
            if i % 5 == 0 {
                cache.remove(&(i % 11));
            }
            assert!(cache.len() <= 8);
        }
    }

    #[test]
    fn test_shared_cache() {
        let cache = Arc::new(SharedLruCache::new(2));

        cache.insert("a", Arc::new(1));
        cache.insert("b", Arc::new(2));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.get(&"a").map(|v| *v))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(1));
        }

        assert_eq!(cache.get(&"c"), None);
        assert_eq!(cache.stats().hits(), 4);
        assert_eq!(cache.capacity(), 2);
    }
}
