//! # Lagoon Sweep
//!
//! The process-wide side of Lagoon: a weakly-referenced registry of live
//! caches and the single background worker that walks it.
//!
//! ## Design
//!
//! - **Registry**: holds every cache awaiting sweeps through a `Weak`
//!   handle, so membership never keeps a cache alive.
//! - **Sweeper**: one worker thread per process, parked until notified.
//!   Notifications come from a host memory-pressure signal (when one
//!   exists) or from the probabilistic trigger inside cache traffic, and
//!   are debounced to at most one pass per interval.
//! - **Signal sources**: the host pressure mechanism is feature-detected
//!   once; an unsupported host degrades to traffic-driven sweeps only.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use lagoon_core::SystemClock;
//! use lagoon_sweep::{SweepRegistry, Sweeper};
//!
//! // Default-constructed caches use `Sweeper::global()`; an embedded
//! // sweeper over its own registry looks like this:
//! let sweeper = Sweeper::with_parts(
//!     Arc::new(SweepRegistry::new()),
//!     Arc::new(SystemClock::new()),
//!     15_000, // debounce floor between passes
//!     50,     // yield between caches inside a pass
//! );
//! sweeper.notify(); // cheap, debounced, non-blocking
//! sweeper.shutdown().unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod registry;
pub mod signal;
pub mod sweeper;

// Re-export commonly used items at crate root
pub use registry::{mint_token, SweepRegistry};
pub use signal::{ManualSignalSource, NullSignalSource};
pub use sweeper::{ShutdownGuard, SweepPhase, SweepStats, Sweeper};
