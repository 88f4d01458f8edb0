//! Signal-source implementations.
//!
//! A [`SignalSource`] is the host mechanism that raises memory-pressure
//! notifications. Hosts without one use [`NullSignalSource`]; embedders
//! that do have a pressure event (an allocator hook, a container memory
//! watcher) bridge it through [`ManualSignalSource::raise`].

use parking_lot::Mutex;
use tracing::debug;

use lagoon_core::traits::{SignalCallback, SignalSource};

/// Signal source for hosts with no memory-pressure mechanism.
///
/// `subscribe` always reports unsupported, so the sweeper runs purely on
/// the traffic-driven trigger.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSignalSource;

impl SignalSource for NullSignalSource {
    fn subscribe(&self, _callback: SignalCallback) -> bool {
        false
    }
}

/// Signal source driven by explicit [`raise`](ManualSignalSource::raise)
/// calls.
///
/// Doubles as the adapter for real pressure events and as the test double
/// for the subscription path.
#[derive(Default)]
pub struct ManualSignalSource {
    callbacks: Mutex<Vec<SignalCallback>>,
}

impl ManualSignalSource {
    /// Creates a source with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires every subscribed callback, synchronously, in subscription
    /// order.
    pub fn raise(&self) {
        let callbacks = self.callbacks.lock();
        debug!(subscribers = callbacks.len(), "Raising pressure signal");
        for callback in callbacks.iter() {
            callback();
        }
    }

    /// Returns the number of subscribed callbacks.
    pub fn subscriber_count(&self) -> usize {
        self.callbacks.lock().len()
    }
}

impl SignalSource for ManualSignalSource {
    fn subscribe(&self, callback: SignalCallback) -> bool {
        self.callbacks.lock().push(callback);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_null_source_unsupported() {
        let fired = Arc::new(AtomicUsize::new(0));
        let f = fired.clone();

        let supported = NullSignalSource.subscribe(Box::new(move || {
            f.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!supported);
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_manual_source_fires_subscribers() {
        let source = ManualSignalSource::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            let f = fired.clone();
            assert!(source.subscribe(Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            })));
        }
        assert_eq!(source.subscriber_count(), 3);

        source.raise();
        source.raise();
        assert_eq!(fired.load(Ordering::SeqCst), 6);
    }
}
