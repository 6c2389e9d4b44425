//! Read/write-lock store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::cache::Cacher;

// == RwLock Cache ==
/// Store whose reads (`load`, `range`) share the lock and whose writes take it
/// exclusively. Default strategy for every table.
#[derive(Debug)]
pub struct RwLockCache<V> {
    name: String,
    items: RwLock<HashMap<String, V>>,
}

impl<V> RwLockCache<V> {
    /// Creates an empty store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            items: RwLock::new(HashMap::new()),
        }
    }
}

impl<V> Cacher for RwLockCache<V>
where
    V: Clone + Send + Sync,
{
    type Value = V;

    fn load(&self, key: &str) -> Option<V> {
        self.items.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: V) -> bool {
        self.items.write().insert(key.to_string(), value);
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.items.write().remove(key);
        true
    }

    fn range(&self) -> (HashMap<String, V>, usize) {
        let snapshot = self.items.read().clone();
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
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_rwlock_overwrite() {
        let cache: RwLockCache<u32> = RwLockCache::new("users");

        cache.store("alice", 1u32);
        cache.store("alice", 2u32);

        assert_eq!(cache.load("alice"), Some(2));
        assert_eq!(cache.range().1, 1);
    }

    #[test]
    fn test_rwlock_readers_see_writes_from_other_threads() {
        let cache: Arc<RwLockCache<u32>> = Arc::new(RwLockCache::new("users"));

        let writer = {
            let cache = cache.clone();
            thread::spawn(move || {
                for i in 0..100u32 {
                    cache.store(&format!("k{}", i), i);
                }
            })
        };
        writer.join().unwrap();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                thread::spawn(move || cache.load("k42"))
            })
            .collect();

        for reader in readers {
            assert_eq!(reader.join().unwrap(), Some(42));
        }
    }
}
