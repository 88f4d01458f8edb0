//! Weakly-referenced registry of live caches.
//!
//! Membership is keyed by an identity token minted per cache instance, not
//! by the cache's contents, because a cache may become unreachable while
//! its token is still in the member table. Handles are `Weak`, so the
//! registry is never the reason a cache stays alive; reclaimed members are
//! discarded lazily during iteration.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;
use tracing::debug;

use lagoon_core::traits::Sweepable;

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

/// Mints a process-unique identity token for one cache instance.
pub fn mint_token() -> u64 {
    NEXT_TOKEN.fetch_add(1, Ordering::SeqCst)
}

/// Process-wide set of caches awaiting sweeps.
///
/// # Thread Safety
///
/// All operations are internally synchronized. The member lock is never
/// held while calling into a member, so caches may register from arbitrary
/// threads while a sweep is iterating.
#[derive(Default)]
pub struct SweepRegistry {
    members: Mutex<HashMap<u64, Weak<dyn Sweepable>>>,
}

impl SweepRegistry {
    /// Creates an isolated registry (tests, embedded sweepers).
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry used by default-constructed caches.
    pub fn global() -> Arc<SweepRegistry> {
        static GLOBAL: OnceLock<Arc<SweepRegistry>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(SweepRegistry::new())).clone()
    }

    /// Registers a member under `token`. Idempotent.
    pub fn register(&self, token: u64, member: Weak<dyn Sweepable>) {
        let mut members = self.members.lock();
        if members.insert(token, member).is_none() {
            debug!(token, total = members.len(), "Registered cache for sweeping");
        }
    }

    /// Removes the member registered under `token`, if any.
    ///
    /// Called by the sweeper once a member reports empty; the member
    /// re-registers itself on its next use.
    pub fn drop_token(&self, token: u64) {
        if self.members.lock().remove(&token).is_some() {
            debug!(token, "Dropped empty cache from registry");
        }
    }

    /// Iterates live members, discarding reclaimed handles.
    ///
    /// This is the sweeper's only read access point. The member lock is
    /// released before `f` runs, so `f` may call back into the registry.
    pub fn for_each(&self, mut f: impl FnMut(u64, Arc<dyn Sweepable>)) {
        let snapshot: Vec<(u64, Weak<dyn Sweepable>)> = self
            .members
            .lock()
            .iter()
            .map(|(token, weak)| (*token, weak.clone()))
            .collect();

        let mut dead = Vec::new();
        for (token, weak) in snapshot {
            match weak.upgrade() {
                Some(member) => f(token, member),
                None => dead.push(token),
            }
        }

        if !dead.is_empty() {
            let mut members = self.members.lock();
            for token in dead {
                // Re-check: the token may have been reused by a re-registration
                // racing this prune.
                if members
                    .get(&token)
                    .is_some_and(|weak| weak.strong_count() == 0)
                {
                    members.remove(&token);
                    debug!(token, "Discarded reclaimed cache handle");
                }
            }
        }
    }

    /// Returns the number of registered members, live or not.
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Returns true if no members are registered.
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lagoon_core::error::Result;

    struct Countable;

    impl Sweepable for Countable {
        fn sweep(&self) -> Result<bool> {
            Ok(false)
        }
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = mint_token();
        let b = mint_token();
        assert_ne!(a, b);
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = SweepRegistry::new();
        let member = Arc::new(Countable);
        let token = mint_token();

        let weak = Arc::downgrade(&member);
        let weak: Weak<dyn Sweepable> = weak;
        registry.register(token, weak.clone());
        registry.register(token, weak);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_for_each_visits_live_members() {
        let registry = SweepRegistry::new();
        let a = Arc::new(Countable);
        let b = Arc::new(Countable);
        registry.register(mint_token(), { let w = Arc::downgrade(&a); let w: std::sync::Weak<dyn Sweepable> = w; w });
        registry.register(mint_token(), { let w = Arc::downgrade(&b); let w: std::sync::Weak<dyn Sweepable> = w; w });

        let mut visited = 0;
        registry.for_each(|_, _| visited += 1);
        assert_eq!(visited, 2);
    }

    #[test]
    fn test_membership_does_not_extend_lifetime() {
        let registry = SweepRegistry::new();
        let member = Arc::new(Countable);
        registry.register(mint_token(), { let w = Arc::downgrade(&member); let w: std::sync::Weak<dyn Sweepable> = w; w });

        drop(member);

        let mut visited = 0;
        registry.for_each(|_, _| visited += 1);
        assert_eq!(visited, 0);
        // The dead handle was lazily discarded.
        assert!(registry.is_empty());
    }

    #[test]
    fn test_drop_token() {
        let registry = SweepRegistry::new();
        let member = Arc::new(Countable);
        let token = mint_token();
        registry.register(token, { let w = Arc::downgrade(&member); let w: std::sync::Weak<dyn Sweepable> = w; w });

        registry.drop_token(token);
        assert!(registry.is_empty());

        // Dropping an absent token is a no-op.
        registry.drop_token(token);
    }

    #[test]
    fn test_callback_may_reenter_registry() {
        let registry = Arc::new(SweepRegistry::new());
        let member = Arc::new(Countable);
        let token = mint_token();
        registry.register(token, { let w = Arc::downgrade(&member); let w: std::sync::Weak<dyn Sweepable> = w; w });

        let reg = registry.clone();
        registry.for_each(|t, _| reg.drop_token(t));
        assert!(registry.is_empty());
    }
}
