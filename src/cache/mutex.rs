//! Exclusive-lock store.

use std::collections::HashMap;

use parking_lot::Mutex;

use crate::cache::Cacher;

// == Mutex Cache ==
/// Store guarded by a single mutex.
///
/// `range` holds the lock for the whole copy, so under read-heavy load it is
/// the longest critical section of this variant.
#[derive(Debug)]
pub struct MutexCache<V> {
    name: String,
    items: Mutex<HashMap<String, V>>,
}

impl<V> MutexCache<V> {
    /// Creates an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: Mutex::new(HashMap::new()),
        }
    }
}

impl<V> Cacher for MutexCache<V>
where
    V: Clone + Send + Sync,
{
    type Value = V;

    fn load(&self, key: &str) -> Option<V> {
        self.items.lock().get(key).cloned()
    }

    fn store(&self, key: &str, value: V) -> bool {
        self.items.lock().insert(key.to_string(), value);
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.items.lock().remove(key);
        true
    }

    fn range(&self) -> (HashMap<String, V>, usize) {
        let items = self.items.lock();
        let snapshot = items.clone();
        let count = snapshot.len();
        (snapshot, count)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutex_store_and_load() {
        let cache: MutexCache<String> = MutexCache::new("posts");

        assert!(cache.store("p1", "hello".to_string()));
        assert_eq!(cache.load("p1"), Some("hello".to_string()));
        assert_eq!(cache.load("p2"), None);
    }

    #[test]
    fn test_mutex_delete_is_idempotent() {
        let cache: MutexCache<u8> = MutexCache::new("posts");
        cache.store("p1", 1u8);

        assert!(cache.delete("p1"));
        assert!(cache.delete("p1"));
        assert_eq!(cache.load("p1"), None);
    }

    #[test]
    fn test_mutex_range_is_a_copy() {
        let cache: MutexCache<u32> = MutexCache::new("posts");
        cache.store("a", 1u32);
        cache.store("b", 2u32);

        let (mut snapshot, count) = cache.range();
        assert_eq!(count, 2);

        snapshot.insert("c".to_string(), 3);
        assert_eq!(cache.range().1, 2);
    }
}
