//! Backing-store implementations.
//!
//! The cache owns its store exclusively; what it needs from the store is
//! per-key exclusive access for touches and removal predicated on the
//! *live* entry. A store that is safe for concurrent mutation (the
//! default) needs no cache-level lock on top; a plain map is wrapped in a
//! single per-instance mutex instead.

use std::collections::HashMap;
use std::hash::Hash;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::entry::Entry;

/// Backing map of a cache.
///
/// Implementations must make [`update`](Store::update) exclusive per key
/// (two concurrent touches of one entry serialize) and must evaluate the
/// [`remove_if`](Store::remove_if) predicate against the live entry under
/// that same exclusivity; the cache's re-check-before-remove discipline
/// rests on both.
pub trait Store<K, V>: Send + Sync {
    /// Runs `f` on the live entry under per-key exclusive access.
    ///
    /// Returns `None` if the key is absent.
    fn update<R>(&self, key: &K, f: impl FnOnce(&mut Entry<V>) -> R) -> Option<R>;

    /// Inserts an entry, replacing any previous one wholesale.
    fn insert(&self, key: K, entry: Entry<V>);

    /// Removes a mapping, returning its entry.
    fn remove(&self, key: &K) -> Option<Entry<V>>;

    /// Removes a mapping only if the live entry satisfies `pred`.
    ///
    /// Returns whether a removal happened.
    fn remove_if(&self, key: &K, pred: impl FnOnce(&Entry<V>) -> bool) -> bool;

    /// Drops all entries.
    fn clear(&self);

    /// Point-in-time snapshot of the key set.
    fn keys(&self) -> Vec<K>;

    /// Counts entries satisfying `pred`.
    fn count_if(&self, pred: impl Fn(&Entry<V>) -> bool) -> usize;

    /// Number of entries, fresh or stale.
    fn len(&self) -> usize;

    /// True if the store holds no entries.
    fn is_empty(&self) -> bool;
}

/// Concurrency-safe backing store over a sharded map, the default.
///
/// Safe for concurrent mutation, so the cache takes no extra lock; per-key
/// exclusivity comes from the shard guards.
pub struct ConcurrentStore<K, V> {
    map: DashMap<K, Entry<V>>,
}

impl<K, V> ConcurrentStore<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty store.
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }
}

impl<K, V> Default for ConcurrentStore<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V> for ConcurrentStore<K, V>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
{
    fn update<R>(&self, key: &K, f: impl FnOnce(&mut Entry<V>) -> R) -> Option<R> {
        self.map.get_mut(key).map(|mut entry| f(&mut entry))
    }

    fn insert(&self, key: K, entry: Entry<V>) {
        self.map.insert(key, entry);
    }

    fn remove(&self, key: &K) -> Option<Entry<V>> {
        self.map.remove(key).map(|(_, entry)| entry)
    }

    fn remove_if(&self, key: &K, pred: impl FnOnce(&Entry<V>) -> bool) -> bool {
        self.map.remove_if(key, |_, entry| pred(entry)).is_some()
    }

    fn clear(&self) {
        self.map.clear();
    }

    fn keys(&self) -> Vec<K> {
        self.map.iter().map(|entry| entry.key().clone()).collect()
    }

    fn count_if(&self, pred: impl Fn(&Entry<V>) -> bool) -> usize {
        self.map.iter().filter(|entry| pred(entry)).count()
    }

    fn len(&self) -> usize {
        self.map.len()
    }

    fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Backing store for maps with no internal synchronization.
///
/// Every operation serializes through one per-instance mutex, which also
/// provides the per-key exclusivity [`update`](Store::update) and
/// [`remove_if`](Store::remove_if) require.
pub struct LockedStore<K, V> {
    map: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> LockedStore<K, V> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            map: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for LockedStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V> for LockedStore<K, V>
where
    K: Eq + Hash + Clone + Send,
    V: Send,
{
    fn update<R>(&self, key: &K, f: impl FnOnce(&mut Entry<V>) -> R) -> Option<R> {
        self.map.lock().get_mut(key).map(f)
    }

    fn insert(&self, key: K, entry: Entry<V>) {
        self.map.lock().insert(key, entry);
    }

    fn remove(&self, key: &K) -> Option<Entry<V>> {
        self.map.lock().remove(key)
    }

    fn remove_if(&self, key: &K, pred: impl FnOnce(&Entry<V>) -> bool) -> bool {
        let mut map = self.map.lock();
        let matched = map.get(key).is_some_and(pred);
        if matched {
            map.remove(key);
        }
        matched
    }

    fn clear(&self) {
        self.map.lock().clear();
    }

    fn keys(&self) -> Vec<K> {
        self.map.lock().keys().cloned().collect()
    }

    fn count_if(&self, pred: impl Fn(&Entry<V>) -> bool) -> usize {
        self.map.lock().values().filter(|entry| pred(entry)).count()
    }

    fn len(&self) -> usize {
        self.map.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.map.lock().is_empty()
    }
}
