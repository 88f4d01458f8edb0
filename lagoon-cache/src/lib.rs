//! # Lagoon Cache
//!
//! Expiring in-memory key/value cache.
//!
//! Entries expire by **idle time** (unread for longer than the idle
//! timeout) and by **absolute age** (older than the max age, no matter how
//! often they are read). Readers never observe an expired value; physical
//! reclamation happens on access and in a process-wide background sweeper
//! shared by all caches, so no cache runs its own timer.
//!
//! ## Example
//!
//! ```rust
//! use lagoon_cache::{Cache, CacheConfig};
//!
//! let cache: Cache<String, String> = Cache::with_config(
//!     CacheConfig::new()
//!         .idle_timeout_ms(5_000)
//!         .max_age_ms(60_000),
//! );
//!
//! cache.put("session".to_string(), "data".to_string());
//! assert_eq!(cache.get(&"session".to_string()).as_deref(), Some("data"));
//! ```
//!
//! ## Deterministic tests
//!
//! Expiry is driven by a [`Clock`](lagoon_core::Clock); inject a
//! [`ManualClock`](lagoon_core::ManualClock) through
//! [`Cache::with_parts`] to test timeouts without sleeping.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod cache;
pub mod entry;
pub mod store;

// Re-export commonly used items at crate root
pub use cache::{Cache, CacheConfig, CacheStats};
pub use entry::Entry;
pub use store::{ConcurrentStore, LockedStore, Store};
