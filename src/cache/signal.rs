//! Condition-variable store.

use std::collections::HashMap;

use parking_lot::{Condvar, Mutex};

use crate::cache::Cacher;

#[derive(Debug)]
struct SignalState<V> {
    updated: bool,
    items: HashMap<String, V>,
}

// == Signal Cache ==
/// Store whose readers never observe it before its first write.
///
/// # Blocking
///
/// `load` and `range` **suspend the calling thread** until at least one
/// `store` or `delete` has completed since construction, or until
/// `mark_ready` is called. A store that gets neither will stall every reader
/// forever, and an async caller will park its runtime worker while waiting.
/// Only use this strategy for tables that are seeded right after creation;
/// `Database::load_all` marks every table ready once it has run.
///
/// After the first write, readers only wait for the lock itself; later writes
/// do not re-block them. `peek` and `peek_range` never wait.
#[derive(Debug)]
pub struct SignalCache<V> {
    name: String,
    state: Mutex<SignalState<V>>,
    signal: Condvar,
}

impl<V> SignalCache<V> {
    /// Creates an empty, not-yet-readable store.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(SignalState {
                updated: false,
                items: HashMap::new(),
            }),
            signal: Condvar::new(),
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut HashMap<String, V>)) {
        {
            let mut state = self.state.lock();
            state.updated = false;
            apply(&mut state.items);
            state.updated = true;
        }
        self.signal.notify_all();
    }
}

impl<V> Cacher for SignalCache<V>
where
    V: Clone + Send + Sync,
{
    type Value = V;

    fn load(&self, key: &str) -> Option<V> {
        let mut state = self.state.lock();
        while !state.updated {
            self.signal.wait(&mut state);
        }
        state.items.get(key).cloned()
    }

    fn store(&self, key: &str, value: V) -> bool {
        self.mutate(|items| {
            items.insert(key.to_string(), value);
        });
        true
    }

    fn delete(&self, key: &str) -> bool {
        self.mutate(|items| {
            items.remove(key);
        });
        true
    }

    fn range(&self) -> (HashMap<String, V>, usize) {
        let mut state = self.state.lock();
        while !state.updated {
            self.signal.wait(&mut state);
        }
        let snapshot = state.items.clone();
        let count = snapshot.len();
        (snapshot, count)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn peek(&self, key: &str) -> Option<V> {
        self.state.lock().items.get(key).cloned()
    }

    fn peek_range(&self) -> (HashMap<String, V>, usize) {
        let snapshot = self.state.lock().items.clone();
        let count = snapshot.len();
        (snapshot, count)
    }

    fn mark_ready(&self) {
        self.state.lock().updated = true;
        self.signal.notify_all();
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_signal_load_waits_for_first_store() {
        let cache: Arc<SignalCache<String>> = Arc::new(SignalCache::new("tokens"));
        let (tx, rx) = mpsc::channel();

        {
            let cache = cache.clone();
            thread::spawn(move || {
                let value = cache.load("fp");
                let _ = tx.send(value);
            });
        }

        // Nothing written yet: the reader must still be parked.
        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());

        cache.store("fp", "alice".to_string());

        let value = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(value, Some("alice".to_string()));
    }

    #[test]
    fn test_signal_range_waits_for_first_delete() {
        let cache: Arc<SignalCache<u8>> = Arc::new(SignalCache::new("tokens"));
        let (tx, rx) = mpsc::channel();

        {
            let cache = cache.clone();
            thread::spawn(move || {
                let _ = tx.send(cache.range().1);
            });
        }

        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());

        cache.delete("missing");

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 0);
    }

    #[test]
    fn test_signal_reads_do_not_block_after_first_write() {
        let cache: SignalCache<u32> = SignalCache::new("tokens");
        cache.store("a", 1u32);
        cache.store("b", 2u32);

        assert_eq!(cache.load("a"), Some(1));
        assert_eq!(cache.load("zzz"), None);
        assert_eq!(cache.range().1, 2);
    }

    #[test]
    fn test_signal_mark_ready_releases_waiting_reader() {
        let cache: Arc<SignalCache<u32>> = Arc::new(SignalCache::new("users"));
        let (tx, rx) = mpsc::channel();

        {
            let cache = cache.clone();
            thread::spawn(move || {
                let _ = tx.send(cache.load("bob"));
            });
        }

        assert!(rx.recv_timeout(Duration::from_millis(150)).is_err());

        cache.mark_ready();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), None);
        assert_eq!(cache.range().1, 0);
    }

    #[test]
    fn test_signal_peek_never_waits() {
        let cache: SignalCache<u32> = SignalCache::new("tokens");
        assert_eq!(cache.peek("a"), None);
        assert_eq!(cache.peek_range().1, 0);
    }
}
