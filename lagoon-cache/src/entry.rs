//! Cache entry with idle-timeout and max-age staleness.

/// The (value, created, last_access) triple stored per key.
///
/// An entry is *stale* once its idle time exceeds the idle timeout or,
/// when a max age is configured, once its total age exceeds that bound.
/// A stale entry is never mutated again; it only awaits removal.
#[derive(Clone, Debug)]
pub struct Entry<V> {
    value: V,
    /// Set once at insertion.
    created: u64,
    /// Updated on every successful read of a fresh entry.
    last_access: u64,
}

impl<V> Entry<V> {
    /// Creates an entry with `created = last_access = now`.
    pub fn new(value: V, now: u64) -> Self {
        Self {
            value,
            created: now,
            last_access: now,
        }
    }

    /// Returns the stored value.
    pub fn value(&self) -> &V {
        &self.value
    }

    /// Consumes the entry, returning the value.
    pub fn into_value(self) -> V {
        self.value
    }

    /// Insertion timestamp in milliseconds.
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Last successful read timestamp in milliseconds.
    pub fn last_access(&self) -> u64 {
        self.last_access
    }

    /// True iff the entry's idle time or total age exceeded its bound.
    ///
    /// Subtractions saturate, so a clock stepped backwards reads as zero
    /// elapsed time rather than underflowing.
    pub fn is_stale(&self, now: u64, idle_timeout_ms: u64, max_age_ms: Option<u64>) -> bool {
        if now.saturating_sub(self.last_access) > idle_timeout_ms {
            return true;
        }
        match max_age_ms {
            Some(max_age) => now.saturating_sub(self.created) > max_age,
            None => false,
        }
    }

    /// Marks the entry as read.
    ///
    /// Returns false if the entry is stale, in which case the caller must
    /// treat it as absent and remove it; a stale entry is never revived.
    /// On success `last_access` moves forward (never backward) and the
    /// entry stays fresh.
    pub fn touch(&mut self, now: u64, idle_timeout_ms: u64, max_age_ms: Option<u64>) -> bool {
        if self.is_stale(now, idle_timeout_ms, max_age_ms) {
            return false;
        }
        self.last_access = self.last_access.max(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_entry_is_fresh() {
        let entry = Entry::new("v", 1_000);
        assert_eq!(entry.created(), 1_000);
        assert_eq!(entry.last_access(), 1_000);
        assert!(!entry.is_stale(1_000, 100, None));
    }

    #[test]
    fn test_idle_staleness_boundary() {
        let entry = Entry::new("v", 1_000);
        // Strictly-greater comparison: exactly at the bound is still fresh.
        assert!(!entry.is_stale(1_100, 100, None));
        assert!(entry.is_stale(1_101, 100, None));
    }

    #[test]
    fn test_max_age_staleness() {
        let mut entry = Entry::new("v", 1_000);
        // Touch every 60ms; idle window never exceeded.
        for step in 1..=20u64 {
            let now = 1_000 + step * 60;
            let fresh = entry.touch(now, 100, Some(500));
            // Total age passes 500ms during step 9 (now - created = 540).
            assert_eq!(fresh, step * 60 <= 500, "step {step}");
            if !fresh {
                break;
            }
        }
    }

    #[test]
    fn test_touch_refreshes_idle_window() {
        let mut entry = Entry::new("v", 1_000);
        assert!(entry.touch(1_090, 100, None));
        assert_eq!(entry.last_access(), 1_090);
        // Without the touch this read would be past the idle bound.
        assert!(!entry.is_stale(1_150, 100, None));
    }

    #[test]
    fn test_stale_entry_not_revived_by_touch() {
        let mut entry = Entry::new("v", 1_000);
        assert!(!entry.touch(2_000, 100, None));
        // last_access unchanged by the failed touch.
        assert_eq!(entry.last_access(), 1_000);
    }

    #[test]
    fn test_clock_stepped_backwards() {
        let mut entry = Entry::new("v", 1_000);
        assert!(!entry.is_stale(500, 100, Some(1_000)));
        // A touch from the past does not move last_access backwards.
        assert!(entry.touch(500, 100, None));
        assert_eq!(entry.last_access(), 1_000);
    }

    proptest! {
        /// Staleness matches its defining inequality exactly.
        #[test]
        fn prop_staleness_matches_invariant(
            created in 0u64..u64::MAX / 4,
            idle_delta in 0u64..1_000_000,
            now_delta in 0u64..1_000_000,
            idle_timeout in 0u64..1_000_000,
            max_age in proptest::option::of(0u64..1_000_000),
        ) {
            let mut entry = Entry::new((), created);
            let touched_at = created + idle_delta;
            entry.touch(touched_at, u64::MAX, None);
            let now = touched_at + now_delta;

            let expected = now - entry.last_access() > idle_timeout
                || max_age.is_some_and(|m| now - created > m);
            prop_assert_eq!(entry.is_stale(now, idle_timeout, max_age), expected);
        }

        /// Staleness is monotone: once stale, later instants are stale too.
        #[test]
        fn prop_staleness_monotone_in_now(
            created in 0u64..u64::MAX / 4,
            a in 0u64..1_000_000,
            b in 0u64..1_000_000,
            idle_timeout in 0u64..1_000_000,
            max_age in proptest::option::of(0u64..1_000_000),
        ) {
            let entry = Entry::new((), created);
            let (earlier, later) = (created + a.min(b), created + a.max(b));
            if entry.is_stale(earlier, idle_timeout, max_age) {
                prop_assert!(entry.is_stale(later, idle_timeout, max_age));
            }
        }
    }
}
