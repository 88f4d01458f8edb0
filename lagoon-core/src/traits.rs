//! Common traits for Lagoon.
//!
//! These traits define the seams between the cache, the sweeper, and the
//! host environment, enabling modularity and testing.

use crate::error::Result;

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Millisecond time source for age comparisons.
///
/// Implementations might use:
/// - Wall-clock time (production, see [`crate::SystemClock`])
/// - A manually advanced counter (tests, see [`crate::ManualClock`])
///
/// Timestamps only ever feed subtractions against other timestamps from the
/// same clock, so the epoch is irrelevant as long as the value is
/// monotonic-ish.
pub trait Clock: Send + Sync {
    /// Returns the current time in milliseconds.
    fn now_millis(&self) -> u64;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SWEEPABLE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// A registry member the sweeper can ask to reclaim expired state.
///
/// Implemented by every cache; foreign implementations may wrap other
/// expiring containers. The sweeper holds members weakly and tolerates
/// failures, so implementations must never rely on being swept for
/// correctness.
pub trait Sweepable: Send + Sync {
    /// Removes expired state.
    ///
    /// Returns `Ok(true)` if nothing is left, in which case the registry
    /// drops the member until it re-registers.
    fn sweep(&self) -> Result<bool>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// SIGNAL SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Callback invoked when the host raises a memory-pressure event.
pub type SignalCallback = Box<dyn Fn() + Send + Sync>;

/// Host mechanism that raises memory-pressure notifications.
///
/// Support is feature-detected once per process. A host without such a
/// mechanism returns `false` from [`subscribe`](SignalSource::subscribe);
/// the sweeper then relies solely on the traffic-driven trigger.
pub trait SignalSource: Send + Sync {
    /// Registers `callback` to run on every pressure event.
    ///
    /// Returns whether the mechanism is supported. An unsupported source
    /// must drop the callback and return `false` without side effects.
    fn subscribe(&self, callback: SignalCallback) -> bool;
}
