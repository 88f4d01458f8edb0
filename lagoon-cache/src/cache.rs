//! Expiring key/value cache.
//!
//! Entries expire by idle time and by absolute age. Reads hide stale
//! entries immediately; physical reclamation happens on access and in the
//! shared background sweeper, with which every cache registers itself
//! (weakly) on first use.

use std::hash::Hash;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use lagoon_core::clock::SystemClock;
use lagoon_core::constants::{DEFAULT_IDLE_TIMEOUT_MS, DEFAULT_SWEEP_TRIGGER_ONE_IN};
use lagoon_core::error::Result;
use lagoon_core::traits::{Clock, Sweepable};
use lagoon_sweep::{mint_token, Sweeper};

use crate::entry::Entry;
use crate::store::{ConcurrentStore, Store};

/// Cache configuration.
///
/// Construction is infallible: out-of-range values are silently clamped
/// by [`normalized`](CacheConfig::normalized), never rejected.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Idle timeout in milliseconds; an entry unread for longer is stale.
    /// 0 resets to the default (5000).
    pub idle_timeout_ms: u64,
    /// Maximum total age in milliseconds regardless of access frequency.
    /// `None` (the default) means unbounded; bounded values are clamped to
    /// at least the idle timeout.
    pub max_age_ms: Option<u64>,
    /// Probabilistic sweep trigger: roughly one in this many operations
    /// pings the sweeper. 0 disables the trigger.
    pub sweep_trigger_one_in: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            idle_timeout_ms: DEFAULT_IDLE_TIMEOUT_MS,
            max_age_ms: None,
            sweep_trigger_one_in: DEFAULT_SWEEP_TRIGGER_ONE_IN,
        }
    }
}

impl CacheConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the idle timeout.
    pub fn idle_timeout_ms(mut self, ms: u64) -> Self {
        self.idle_timeout_ms = ms;
        self
    }

    /// Sets the maximum total age.
    pub fn max_age_ms(mut self, ms: u64) -> Self {
        self.max_age_ms = Some(ms);
        self
    }

    /// Sets the probabilistic sweep trigger rate (0 disables).
    pub fn sweep_trigger_one_in(mut self, one_in: u32) -> Self {
        self.sweep_trigger_one_in = one_in;
        self
    }

    /// Clamps invalid values into range.
    ///
    /// An idle timeout of 0 resets to the default; a bounded max age is
    /// raised to at least the idle timeout.
    pub fn normalized(mut self) -> Self {
        if self.idle_timeout_ms == 0 {
            self.idle_timeout_ms = DEFAULT_IDLE_TIMEOUT_MS;
        }
        if let Some(max_age) = self.max_age_ms {
            self.max_age_ms = Some(max_age.max(self.idle_timeout_ms));
        }
        self
    }
}

/// Cache statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheStats {
    /// Entries currently in the store, fresh or stale.
    pub total_entries: usize,
    /// Entries past their staleness bound awaiting removal.
    pub stale_entries: usize,
    /// Entries still visible to readers.
    pub fresh_entries: usize,
}

struct CacheInner<K, V, S> {
    store: S,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    sweeper: Sweeper,
    /// Identity token in the sweep registry.
    token: u64,
    /// True while this cache believes it is registered for sweeping.
    registered: AtomicBool,
    _marker: PhantomData<fn() -> (K, V)>,
}

/// Expiring in-memory cache.
///
/// # Expiration
///
/// An entry is stale once `now - last_access > idle_timeout` or, with a
/// bounded max age, once `now - created > max_age`. Readers never observe
/// a stale value; physical removal happens on the access that detects
/// staleness and in background sweep passes.
///
/// # Thread Safety
///
/// The backing store is pluggable through the [`Store`] trait. The
/// default, [`ConcurrentStore`], is safe for concurrent mutation, so no
/// per-instance lock is taken on top of it; a plain map goes behind
/// [`LockedStore`](crate::store::LockedStore), which serializes through
/// one per-instance mutex. Either way all operations can run from
/// arbitrary threads. `Cache` is `Clone` and all clones share one store.
///
/// # Sweeping
///
/// On first use the cache registers itself, weakly, with the process-wide
/// sweep registry; registration never keeps a dropped cache alive. About
/// one in [`CacheConfig::sweep_trigger_one_in`] operations pings the
/// sweeper so reclamation keeps up with traffic.
///
/// # Example
///
/// ```rust
/// use lagoon_cache::{Cache, CacheConfig};
///
/// let cache: Cache<String, u32> =
///     Cache::with_config(CacheConfig::new().idle_timeout_ms(60_000));
/// cache.put("a".to_string(), 1);
/// assert_eq!(cache.get(&"a".to_string()), Some(1));
/// assert_eq!(cache.get(&"b".to_string()), None);
/// ```
pub struct Cache<K, V, S = ConcurrentStore<K, V>> {
    inner: Arc<CacheInner<K, V, S>>,
}

impl<K, V, S> Clone for Cache<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with default configuration, the system clock, and
    /// the process-wide sweeper.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_store(ConcurrentStore::new(), config)
    }

    /// Creates a cache with an injected clock and sweeper.
    ///
    /// This is the seam for deterministic tests: a
    /// [`ManualClock`](lagoon_core::ManualClock) drives expiry without
    /// sleeping, and an isolated sweeper keeps tests independent.
    pub fn with_parts(config: CacheConfig, clock: Arc<dyn Clock>, sweeper: Sweeper) -> Self {
        Self::with_store_and_parts(ConcurrentStore::new(), config, clock, sweeper)
    }
}

impl<K, V, S> Cache<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Store<K, V> + 'static,
{
    /// Creates a cache over a caller-supplied backing store.
    ///
    /// Use this to swap the default concurrent map for another [`Store`],
    /// e.g. [`LockedStore`](crate::store::LockedStore) for a plain map
    /// behind a per-instance mutex.
    pub fn with_store(store: S, config: CacheConfig) -> Self {
        Self::with_store_and_parts(
            store,
            config,
            Arc::new(SystemClock::new()),
            Sweeper::global().clone(),
        )
    }

    /// Creates a cache over a caller-supplied store, clock, and sweeper.
    pub fn with_store_and_parts(
        store: S,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
        sweeper: Sweeper,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                store,
                config: config.normalized(),
                clock,
                sweeper,
                token: mint_token(),
                registered: AtomicBool::new(false),
                _marker: PhantomData,
            }),
        }
    }

    /// Returns the normalized configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Returns the cache's identity token in the sweep registry.
    pub fn token(&self) -> u64 {
        self.inner.token
    }

    /// Looks up a value, refreshing its idle window on a hit.
    ///
    /// A stale entry is removed and reported absent; absence is a value,
    /// never an error.
    pub fn get(&self, key: &K) -> Option<V> {
        self.ensure_registered();
        self.maybe_trigger_sweep();

        let now = self.inner.clock.now_millis();
        let idle = self.inner.config.idle_timeout_ms;
        let max_age = self.inner.config.max_age_ms;

        let touched = self.inner.store.update(key, |entry| {
            if entry.touch(now, idle, max_age) {
                Some(entry.value().clone())
            } else {
                None
            }
        })?;
        if let Some(value) = touched {
            return Some(value);
        }

        // Stale: evict, but re-check against the live entry so a racing
        // re-insert is not dropped.
        self.inner
            .store
            .remove_if(key, |entry| entry.is_stale(now, idle, max_age));
        None
    }

    /// Inserts a value, replacing any previous entry wholesale.
    ///
    /// The new entry starts with `created = last_access = now`; nothing is
    /// merged from a replaced entry.
    pub fn put(&self, key: K, value: V) {
        self.ensure_registered();
        self.maybe_trigger_sweep();

        let now = self.inner.clock.now_millis();
        self.inner.store.insert(key, Entry::new(value, now));
    }

    /// Removes a mapping, returning the previous value if it was still
    /// fresh.
    pub fn remove(&self, key: &K) -> Option<V> {
        self.ensure_registered();

        let now = self.inner.clock.now_millis();
        let idle = self.inner.config.idle_timeout_ms;
        let max_age = self.inner.config.max_age_ms;

        self.inner.store.remove(key).and_then(|entry| {
            if entry.is_stale(now, idle, max_age) {
                None
            } else {
                Some(entry.into_value())
            }
        })
    }

    /// Drops all entries.
    ///
    /// Safe to interleave with a concurrent sweep pass; the pass simply
    /// finds nothing left to remove.
    pub fn clear(&self) {
        self.inner.store.clear();
    }

    /// Removes every stale entry, returning whether the store is empty
    /// afterwards.
    ///
    /// Called by the background sweeper and callable directly. Safe to run
    /// concurrently with `get`/`put`: removal re-checks staleness against
    /// the live entry, so an entry touched or re-inserted after the
    /// snapshot survives.
    pub fn clean(&self) -> bool {
        self.inner.clean(self.inner.clock.now_millis())
    }

    /// Returns the number of entries, fresh or stale.
    pub fn len(&self) -> usize {
        self.inner.store.len()
    }

    /// Returns true if the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.inner.store.is_empty()
    }

    /// Returns entry counts split by staleness.
    pub fn stats(&self) -> CacheStats {
        let now = self.inner.clock.now_millis();
        let idle = self.inner.config.idle_timeout_ms;
        let max_age = self.inner.config.max_age_ms;

        let total = self.inner.store.len();
        let stale = self
            .inner
            .store
            .count_if(|entry| entry.is_stale(now, idle, max_age));
        CacheStats {
            total_entries: total,
            stale_entries: stale,
            fresh_entries: total.saturating_sub(stale),
        }
    }

    /// Registers this cache with the sweep registry. Idempotent; runs the
    /// actual registration only on the first use after construction or
    /// after the sweeper dropped the cache as empty.
    fn ensure_registered(&self) {
        if self
            .inner
            .registered
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            let weak = Arc::downgrade(&self.inner);
            let weak: std::sync::Weak<dyn Sweepable> = weak;
            self.inner.sweeper.registry().register(self.inner.token, weak);
        }
    }

    /// Pings the sweeper for roughly one in `sweep_trigger_one_in`
    /// operations.
    fn maybe_trigger_sweep(&self) {
        let one_in = self.inner.config.sweep_trigger_one_in;
        if one_in == 0 {
            return;
        }
        if rand::thread_rng().gen_ratio(1, one_in) {
            self.inner.sweeper.notify();
        }
    }
}

impl<K, V, S> CacheInner<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Store<K, V> + 'static,
{
    fn clean(&self, now: u64) -> bool {
        let idle = self.config.idle_timeout_ms;
        let max_age = self.config.max_age_ms;

        // Point-in-time snapshot of the key set; entries are judged live,
        // not from the snapshot.
        let mut removed = 0usize;
        for key in self.store.keys() {
            if self
                .store
                .remove_if(&key, |entry| entry.is_stale(now, idle, max_age))
            {
                removed += 1;
            }
        }

        let empty = self.store.is_empty();
        if removed > 0 {
            debug!(token = self.token, removed, empty, "Cleaned stale entries");
        }
        if empty {
            // The sweeper drops our registry handle next; make the next
            // cache operation re-register.
            self.registered.store(false, Ordering::SeqCst);
        }
        empty
    }
}

impl<K, V, S> Sweepable for CacheInner<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    S: Store<K, V> + 'static,
{
    fn sweep(&self) -> Result<bool> {
        Ok(self.clean(self.clock.now_millis()))
    }
}
