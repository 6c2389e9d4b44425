//! Test doubles wrapping a real store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::Cacher;

/// Counts calls reaching the wrapped store.
pub struct CountingCache<C> {
    inner: C,
    loads: AtomicUsize,
    stores: AtomicUsize,
}

impl<C> CountingCache<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            loads: AtomicUsize::new(0),
            stores: AtomicUsize::new(0),
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn stores(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

impl<C: Cacher> Cacher for CountingCache<C> {
    type Value = C::Value;

    fn load(&self, key: &str) -> Option<C::Value> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load(key)
    }

    fn store(&self, key: &str, value: C::Value) -> bool {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(key, value)
    }

    fn delete(&self, key: &str) -> bool {
        self.inner.delete(key)
    }

    fn range(&self) -> (HashMap<String, C::Value>, usize) {
        self.inner.range()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn peek(&self, key: &str) -> Option<C::Value> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.peek(key)
    }

    fn peek_range(&self) -> (HashMap<String, C::Value>, usize) {
        self.inner.peek_range()
    }

    fn mark_ready(&self) {
        self.inner.mark_ready()
    }
}

/// Accepts the first `limit` stores, then refuses every further one.
pub struct FailingCache<C> {
    inner: C,
    limit: usize,
    accepted: AtomicUsize,
}

impl<C> FailingCache<C> {
    pub fn new(inner: C, limit: usize) -> Self {
        Self {
            inner,
            limit,
            accepted: AtomicUsize::new(0),
        }
    }
}

impl<C: Cacher> Cacher for FailingCache<C> {
    type Value = C::Value;

    fn load(&self, key: &str) -> Option<C::Value> {
        self.inner.load(key)
    }

    fn store(&self, key: &str, value: C::Value) -> bool {
        if self.accepted.fetch_add(1, Ordering::SeqCst) >= self.limit {
            return false;
        }
        self.inner.store(key, value)
    }

    fn delete(&self, key: &str) -> bool {
        self.inner.delete(key)
    }

    fn range(&self) -> (HashMap<String, C::Value>, usize) {
        self.inner.range()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn peek(&self, key: &str) -> Option<C::Value> {
        self.inner.peek(key)
    }

    fn mark_ready(&self) {
        self.inner.mark_ready()
    }
}

/// Panics on every bulk read.
pub struct PanickingCache<V> {
    name: String,
    _value: std::marker::PhantomData<fn() -> V>,
}

impl<V> PanickingCache<V> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            _value: std::marker::PhantomData,
        }
    }
}

impl<V> Cacher for PanickingCache<V> {
    type Value = V;

    fn load(&self, _key: &str) -> Option<V> {
        None
    }

    fn store(&self, _key: &str, _value: V) -> bool {
        true
    }

    fn delete(&self, _key: &str) -> bool {
        true
    }

    fn range(&self) -> (HashMap<String, V>, usize) {
        panic!("range on {}", self.name)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
