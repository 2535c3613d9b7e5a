//! # Reader/writer guarded map.
//!
//! Thin wrapper over `parking_lot::RwLock<HashMap<K, V>>`. Guards never escape a call, so
//! no caller can hold the lock across an `.await`.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::RwLock;

/// Key-value map safe for concurrent readers and an exclusive writer.
#[derive(Debug)]
pub struct LockMap<K, V> {
    inner: RwLock<HashMap<K, V>>,
}

impl<K, V> Default for LockMap<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash, V> LockMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the value stored under `key`.
    pub fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.inner.read().get(key).cloned()
    }

    /// Stores `value`, returning the previous one.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.inner.write().insert(key, value)
    }

    /// Removes `key`, returning its value.
    pub fn delete(&self, key: &K) -> Option<V> {
        self.inner.write().remove(key)
    }

    /// Visits every entry under the read lock.
    ///
    /// `f` must not call back into this map with a write.
    pub fn for_each(&self, mut f: impl FnMut(&K, &V)) {
        for (k, v) in self.inner.read().iter() {
            f(k, v);
        }
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Snapshot of every value.
    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.inner.read().values().cloned().collect()
    }

    /// Runs `f` with exclusive access, for read-modify-write sequences that must be atomic.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut HashMap<K, V>) -> R) -> R {
        f(&mut self.inner.write())
    }

    /// Removes and returns every entry.
    pub fn drain(&self) -> Vec<(K, V)> {
        self.inner.write().drain().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_set_get_delete() {
        let map = LockMap::new();
        assert_eq!(map.set("a", 1), None);
        assert_eq!(map.set("a", 2), Some(1));
        assert_eq!(map.get(&"a"), Some(2));
        assert_eq!(map.len(), 1);

        assert_eq!(map.delete(&"a"), Some(2));
        assert_eq!(map.delete(&"a"), None);
        assert!(map.is_empty());
    }

    #[test]
    fn test_for_each_and_values() {
        let map = LockMap::new();
        for i in 0..5u32 {
            map.set(i, i * 10);
        }
        let mut sum = 0;
        map.for_each(|_, v| sum += *v);
        assert_eq!(sum, 100);

        let mut values = map.values();
        values.sort();
        assert_eq!(values, vec![0, 10, 20, 30, 40]);
    }

    #[test]
    fn test_with_mut_is_atomic_check_and_insert() {
        let map = Arc::new(LockMap::<u32, u32>::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let map = map.clone();
                std::thread::spawn(move || {
                    map.with_mut(|m| {
                        if m.contains_key(&7) {
                            false
                        } else {
                            m.insert(7, 1);
                            true
                        }
                    })
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_drain_empties_map() {
        let map = LockMap::new();
        map.set(1, "x");
        map.set(2, "y");
        let mut drained = map.drain();
        drained.sort();
        assert_eq!(drained, vec![(1, "x"), (2, "y")]);
        assert!(map.is_empty());
    }
}
