//! Singleton background worker that reclaims expired entries.
//!
//! One worker thread serves every cache in the process. It parks until
//! notified, debounces bursts of notifications to at most one pass per
//! interval, walks the registry calling each member's cleanup, and joins
//! cleanly on shutdown. A failure in one member never aborts the pass.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Condvar, Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use lagoon_core::clock::SystemClock;
use lagoon_core::constants::{MIN_SWEEP_INTERVAL_MS, SWEEP_YIELD_MS};
use lagoon_core::error::{LagoonError, Result};
use lagoon_core::traits::{Clock, SignalSource};

use crate::registry::SweepRegistry;

/// Lifecycle of the sweeper worker.
///
/// `Stopped` is terminal: a shut-down sweeper ignores further
/// notifications.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepPhase {
    /// No worker thread exists yet; it spawns lazily on first notify.
    Uninitialized,
    /// Worker is parked awaiting a notification.
    Idle,
    /// Worker is executing a sweep pass.
    Running,
    /// Worker has exited (terminal).
    Stopped,
}

/// Counters accumulated across sweep passes.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SweepStats {
    /// Completed sweep passes.
    pub passes: u64,
    /// Members whose cleanup was invoked.
    pub caches_swept: u64,
    /// Members dropped from the registry after reporting empty.
    pub caches_dropped: u64,
    /// Cleanup calls that returned an error.
    pub failures: u64,
}

struct WorkerState {
    phase: SweepPhase,
    /// A debounce-winning notification arrived and no pass consumed it yet.
    pending: bool,
}

struct SweeperInner {
    registry: Arc<SweepRegistry>,
    clock: Arc<dyn Clock>,
    min_interval_ms: u64,
    yield_ms: u64,
    /// Timestamp of the last debounce-winning notification.
    last_run: AtomicU64,
    state: Mutex<WorkerState>,
    wake: Condvar,
    worker: Mutex<Option<JoinHandle<()>>>,
    /// Cached result of the one-time signal-source feature detection.
    signal_supported: OnceLock<bool>,
    stats: RwLock<SweepStats>,
}

/// Handle to the background sweeper.
///
/// Cloning is cheap; all clones drive the same worker. Most callers use
/// [`Sweeper::global`]; tests build isolated instances with
/// [`Sweeper::with_parts`].
#[derive(Clone)]
pub struct Sweeper {
    inner: Arc<SweeperInner>,
}

impl Sweeper {
    /// Returns the process-wide sweeper used by default-constructed caches.
    pub fn global() -> &'static Sweeper {
        static GLOBAL: OnceLock<Sweeper> = OnceLock::new();
        GLOBAL.get_or_init(|| {
            Sweeper::with_parts(
                SweepRegistry::global(),
                Arc::new(SystemClock::new()),
                MIN_SWEEP_INTERVAL_MS,
                SWEEP_YIELD_MS,
            )
        })
    }

    /// Builds a sweeper over the given registry, clock, and intervals.
    ///
    /// `min_interval_ms` is the debounce floor between passes;
    /// `yield_ms` is the pause between two caches inside one pass.
    pub fn with_parts(
        registry: Arc<SweepRegistry>,
        clock: Arc<dyn Clock>,
        min_interval_ms: u64,
        yield_ms: u64,
    ) -> Self {
        Self {
            inner: Arc::new(SweeperInner {
                registry,
                clock,
                min_interval_ms,
                yield_ms,
                last_run: AtomicU64::new(0),
                state: Mutex::new(WorkerState {
                    phase: SweepPhase::Uninitialized,
                    pending: false,
                }),
                wake: Condvar::new(),
                worker: Mutex::new(None),
                signal_supported: OnceLock::new(),
                stats: RwLock::new(SweepStats::default()),
            }),
        }
    }

    /// Returns the registry this sweeper walks.
    pub fn registry(&self) -> &Arc<SweepRegistry> {
        &self.inner.registry
    }

    /// Returns the current lifecycle phase.
    pub fn phase(&self) -> SweepPhase {
        self.inner.state.lock().phase
    }

    /// Returns accumulated sweep statistics.
    pub fn stats(&self) -> SweepStats {
        self.inner.stats.read().clone()
    }

    /// Requests a sweep pass. Cheap and non-blocking.
    ///
    /// Called from the host memory-pressure callback and from the
    /// probabilistic trigger inside cache traffic. A notification inside
    /// the debounce window is a no-op; the compare-and-swap on the
    /// debounce timestamp lets at most one concurrent caller win. The
    /// winner wakes the parked worker, spawning it first if none exists.
    pub fn notify(&self) {
        if self.phase() == SweepPhase::Stopped {
            return;
        }

        let now = self.inner.clock.now_millis();
        let prev = self.inner.last_run.load(Ordering::SeqCst);
        if now.saturating_sub(prev) < self.inner.min_interval_ms {
            return;
        }
        if self
            .inner
            .last_run
            .compare_exchange(prev, now, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            // Another notifier won the race for this window.
            return;
        }

        self.ensure_worker();

        let mut state = self.inner.state.lock();
        state.pending = true;
        self.inner.wake.notify_all();
    }

    /// Attaches the host memory-pressure signal, feature-detecting support.
    ///
    /// Detection runs once per sweeper; later calls return the cached
    /// result. On an unsupported host the sweeper still works, driven
    /// solely by the traffic trigger, and the degradation is logged once.
    pub fn attach_signal(&self, source: &dyn SignalSource) -> bool {
        *self.inner.signal_supported.get_or_init(|| {
            let sweeper = self.clone();
            let supported = source.subscribe(Box::new(move || sweeper.notify()));
            if supported {
                info!("Subscribed to memory-pressure signal");
            } else {
                info!("Memory-pressure signal unsupported; sweeps are traffic-driven only");
            }
            supported
        })
    }

    /// Returns the cached signal-source detection result, if any ran.
    pub fn signal_supported(&self) -> Option<bool> {
        self.inner.signal_supported.get().copied()
    }

    /// Stops the worker and waits for it to exit. Idempotent.
    ///
    /// After shutdown the sweeper is terminal; caches keep expiring
    /// entries lazily on access.
    pub fn shutdown(&self) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.phase == SweepPhase::Stopped {
                return Ok(());
            }
            state.phase = SweepPhase::Stopped;
            self.inner.wake.notify_all();
        }

        let handle = self.inner.worker.lock().take();
        if let Some(handle) = handle {
            handle
                .join()
                .map_err(|_| LagoonError::WorkerLost("worker panicked".into()))?;
        }
        info!("Sweeper stopped");
        Ok(())
    }

    /// Returns a guard that shuts the sweeper down when dropped.
    ///
    /// Hold it at the bottom of `main` (or the host's termination hook) so
    /// the process never exits with a half-finished sweep on a leaked
    /// thread.
    pub fn shutdown_guard(&self) -> ShutdownGuard {
        ShutdownGuard {
            sweeper: self.clone(),
        }
    }

    /// Spawns the worker thread if it does not exist yet.
    fn ensure_worker(&self) {
        let mut worker = self.inner.worker.lock();
        if worker.is_some() {
            return;
        }
        {
            let mut state = self.inner.state.lock();
            if state.phase == SweepPhase::Stopped {
                return;
            }
            state.phase = SweepPhase::Idle;
        }

        let sweeper = self.clone();
        match std::thread::Builder::new()
            .name("lagoon-sweeper".into())
            .spawn(move || sweeper.worker_loop())
        {
            Ok(handle) => {
                debug!("Sweeper worker started");
                *worker = Some(handle);
            }
            Err(e) => {
                // Retry on a later notify.
                warn!(error = %e, "Failed to spawn sweeper worker");
                self.inner.state.lock().phase = SweepPhase::Uninitialized;
            }
        }
    }

    fn worker_loop(&self) {
        loop {
            {
                let mut state = self.inner.state.lock();
                while !state.pending && state.phase != SweepPhase::Stopped {
                    self.inner.wake.wait(&mut state);
                }
                if state.phase == SweepPhase::Stopped {
                    return;
                }
                state.pending = false;
                state.phase = SweepPhase::Running;
            }

            self.sweep_pass();

            let mut state = self.inner.state.lock();
            if state.phase == SweepPhase::Stopped {
                return;
            }
            state.phase = SweepPhase::Idle;
        }
    }

    /// One complete walk of the registry.
    #[instrument(skip(self))]
    fn sweep_pass(&self) {
        let mut swept = 0u64;
        let mut dropped = 0u64;
        let mut failures = 0u64;
        let mut first = true;

        self.inner.registry.for_each(|token, member| {
            if self.phase() == SweepPhase::Stopped {
                return;
            }
            if !first {
                self.yield_briefly();
                if self.phase() == SweepPhase::Stopped {
                    return;
                }
            }
            first = false;

            swept += 1;
            match member.sweep() {
                Ok(true) => {
                    self.inner.registry.drop_token(token);
                    dropped += 1;
                }
                Ok(false) => {}
                Err(e) => {
                    failures += 1;
                    warn!(token, error = %e, "Cache cleanup failed; continuing sweep");
                }
            }
        });

        let mut stats = self.inner.stats.write();
        stats.passes += 1;
        stats.caches_swept += swept;
        stats.caches_dropped += dropped;
        stats.failures += failures;

        debug!(swept, dropped, failures, "Sweep pass complete");
    }

    /// Inter-cache pause, cut short by shutdown or a fresh notification.
    fn yield_briefly(&self) {
        if self.inner.yield_ms == 0 {
            return;
        }
        let mut state = self.inner.state.lock();
        if state.phase == SweepPhase::Stopped {
            return;
        }
        let _ = self
            .inner
            .wake
            .wait_for(&mut state, Duration::from_millis(self.inner.yield_ms));
    }
}

/// Joins the sweeper worker when dropped. See [`Sweeper::shutdown_guard`].
pub struct ShutdownGuard {
    sweeper: Sweeper,
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        if let Err(e) = self.sweeper.shutdown() {
            warn!(error = %e, "Sweeper shutdown failed");
        }
    }
}
