//! # Lagoon Core
//!
//! Core types, errors, and traits for the Lagoon expiring cache.
//!
//! This crate provides the foundational building blocks used by the other
//! Lagoon crates:
//!
//! - **Errors**: the `LagoonError` hierarchy with context
//! - **Constants**: default timeouts and sweep tuning values
//! - **Traits**: the `Clock`, `Sweepable`, and `SignalSource` seams
//! - **Clocks**: wall-clock and manually driven time sources
//!
//! ## Example
//!
//! ```rust
//! use lagoon_core::{Clock, ManualClock};
//!
//! let clock = ManualClock::new(1_000);
//! clock.advance(500);
//! assert_eq!(clock.now_millis(), 1_500);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod traits;

// Re-export commonly used items at crate root
pub use clock::{ManualClock, SystemClock};
pub use constants::*;
pub use error::{LagoonError, Result};
pub use traits::*;
