//! Typed Repository Helpers
//!
//! Thin wrappers every handler and the snapshot loader go through instead of
//! calling a store directly. The value type is fixed by the store itself, so a
//! lookup can only ever come back as "found" or "not found".

use std::collections::HashMap;

use crate::cache::Cacher;

// == Get All ==
/// Returns every item of the store together with the item count.
pub fn get_all<C>(cache: &C) -> (HashMap<String, C::Value>, usize)
where
    C: Cacher + ?Sized,
{
    cache.range()
}

// == Get One ==
/// Returns the item stored under `key`, or `None` when absent.
pub fn get_one<C>(cache: &C, key: &str) -> Option<C::Value>
where
    C: Cacher + ?Sized,
{
    cache.load(key)
}

// == Set One ==
/// Stores `value` under `key` unless an equal value is already there.
///
/// An unchanged value reports success without touching the store.
pub fn set_one<C>(cache: &C, key: &str, value: C::Value) -> bool
where
    C: Cacher + ?Sized,
    C::Value: PartialEq,
{
    if unchanged(cache, key, &value) {
        return true;
    }
    cache.store(key, value)
}

// == Unchanged ==
/// True when `key` already holds a value equal to `value`.
pub fn unchanged<C>(cache: &C, key: &str, value: &C::Value) -> bool
where
    C: Cacher + ?Sized,
    C::Value: PartialEq,
{
    cache.peek(key).is_some_and(|current| &current == value)
}

// == Delete One ==
/// Removes `key` from the store.
pub fn delete_one<C>(cache: &C, key: &str) -> bool
where
    C: Cacher + ?Sized,
{
    cache.delete(key)
}
