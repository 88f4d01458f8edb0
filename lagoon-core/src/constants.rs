//! Tuning constants for Lagoon.
//!
//! Defaults mirror the behavior callers get when they pass no configuration:
//! a short idle window, unbounded absolute age, and a conservatively
//! debounced sweeper.

/// Default idle timeout in milliseconds.
///
/// An entry not read for longer than this is stale. Configured values of 0
/// are silently reset to this default.
pub const DEFAULT_IDLE_TIMEOUT_MS: u64 = 5_000;

/// Minimum interval between two sweep passes, in milliseconds.
///
/// `Sweeper::notify` calls arriving inside this window are debounced into
/// at most one pass.
pub const MIN_SWEEP_INTERVAL_MS: u64 = 15_000;

/// Pause between two caches inside one sweep pass, in milliseconds.
///
/// Keeps a large sweep from starving caller threads.
pub const SWEEP_YIELD_MS: u64 = 50;

/// Default denominator for the probabilistic sweep trigger.
///
/// Roughly one in this many cache operations pings the sweeper, so sweeps
/// still happen under sustained traffic even when the host never raises a
/// memory-pressure signal. Tunable via `CacheConfig`; 0 disables the
/// trigger entirely.
pub const DEFAULT_SWEEP_TRIGGER_ONE_IN: u32 = 5;
