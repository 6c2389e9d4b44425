//! Cache Module
//!
//! Named in-memory key-value stores with interchangeable locking strategies,
//! plus the typed repository helpers every table is accessed through.

mod mutex;
mod repository;
mod rwlock;
mod signal;

#[cfg(test)]
pub(crate) mod testing;

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

// Re-export public types
pub use mutex::MutexCache;
pub use repository::{delete_one, get_all, get_one, set_one, unchanged};
pub use rwlock::RwLockCache;
pub use signal::SignalCache;

// == Cacher ==
/// Capability set shared by every store strategy.
///
/// None of the operations can fail internally: a miss is `None`, and
/// `store`/`delete` report `true` once the strategy's lock has been taken.
pub trait Cacher: Send + Sync {
    /// Type of every value held by the store.
    type Value;

    /// Returns a clone of the value stored under `key`.
    fn load(&self, key: &str) -> Option<Self::Value>;

    /// Upserts `value` under `key`.
    fn store(&self, key: &str, value: Self::Value) -> bool;

    /// Removes `key`. Deleting an absent key still succeeds.
    fn delete(&self, key: &str) -> bool;

    /// Copies every pair into a fresh map and returns it with the item count.
    fn range(&self) -> (HashMap<String, Self::Value>, usize);

    /// Store identity, used in logs and to pick the snapshot file.
    fn name(&self) -> &str;

    /// Reads without waiting for any readiness condition.
    ///
    /// Same as `load` for every strategy except [`SignalCache`].
    fn peek(&self, key: &str) -> Option<Self::Value> {
        self.load(key)
    }

    /// Copies every pair without waiting for any readiness condition.
    fn peek_range(&self) -> (HashMap<String, Self::Value>, usize) {
        self.range()
    }

    /// Declares the store initialized even if nothing was written to it.
    ///
    /// Releases readers parked on a [`SignalCache`]; a no-op elsewhere.
    fn mark_ready(&self) {}
}

/// Shared handle to a store of `V` values.
pub type Table<V> = Arc<dyn Cacher<Value = V>>;

// == Strategy ==
/// Concurrency discipline chosen when a store is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// One mutex for reads and writes alike.
    Mutex,
    /// Shared lock for reads, exclusive lock for writes.
    #[default]
    RwLock,
    /// Readers block until the first write. See [`SignalCache`].
    Signal,
}

impl Strategy {
    /// Builds an empty store of this strategy.
    pub fn build<V>(self, name: &str) -> Table<V>
    where
        V: Clone + Send + Sync + 'static,
    {
        match self {
            Strategy::Mutex => Arc::new(MutexCache::new(name)),
            Strategy::RwLock => Arc::new(RwLockCache::new(name)),
            Strategy::Signal => Arc::new(SignalCache::new(name)),
        }
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mutex" => Ok(Strategy::Mutex),
            "rwlock" => Ok(Strategy::RwLock),
            "signal" => Ok(Strategy::Signal),
            other => Err(format!("unknown cache strategy: {}", other)),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Mutex => "mutex",
            Strategy::RwLock => "rwlock",
            Strategy::Signal => "signal",
        };
        f.write_str(name)
    }
}
