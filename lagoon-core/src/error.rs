//! Error types for Lagoon.
//!
//! The cache surface itself is total: a missing or expired key is an
//! `Option::None`, never an error. `LagoonError` exists for the seams where
//! something genuinely can fail — a foreign `Sweepable` implementation, the
//! signal-source subscription, or the worker shutdown path.

use thiserror::Error;

/// Result type alias using `LagoonError`.
pub type Result<T> = std::result::Result<T, LagoonError>;

/// Main error type for all Lagoon operations.
#[derive(Debug, Error)]
pub enum LagoonError {
    /// Cleanup of a single cache failed during a sweep pass.
    ///
    /// The sweeper logs this and continues with the remaining caches.
    #[error("Sweep of cache {token} failed: {reason}")]
    SweepFailed {
        /// Registry token of the cache whose cleanup failed.
        token: u64,
        /// Human-readable failure description.
        reason: String,
    },

    /// The host offers no memory-pressure signal to subscribe to.
    ///
    /// Non-fatal: caches fall back to on-access expiry plus the
    /// traffic-driven trigger.
    #[error("Signal source unsupported on this host")]
    SignalUnsupported,

    /// The sweeper worker thread panicked and could not be joined.
    #[error("Sweeper worker lost: {0}")]
    WorkerLost(String),

    /// Internal invariant violation (should never happen).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LagoonError {
    /// Returns true if this error leaves the process in a degraded but
    /// correct state (reclamation is delayed, data is never wrong).
    pub fn is_degradation(&self) -> bool {
        matches!(
            self,
            LagoonError::SweepFailed { .. } | LagoonError::SignalUnsupported
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LagoonError::SweepFailed {
            token: 7,
            reason: "poisoned".into(),
        };
        assert!(err.to_string().contains('7'));
        assert!(err.to_string().contains("poisoned"));
    }

    #[test]
    fn test_error_classification() {
        assert!(LagoonError::SignalUnsupported.is_degradation());
        assert!(LagoonError::SweepFailed {
            token: 1,
            reason: "x".into()
        }
        .is_degradation());
        assert!(!LagoonError::WorkerLost("gone".into()).is_degradation());
        assert!(!LagoonError::Internal("bug".into()).is_degradation());
    }
}
