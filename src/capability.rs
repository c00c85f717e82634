//! Runtime capability detection.

use std::sync::OnceLock;
use std::thread;

use tracing::warn;

/// Probes what the host runtime supports, gating selection between
/// functionally equivalent backend variants.
///
/// The hardware-concurrency hint is resolved once at construction and passed
/// down explicitly; nothing ambient is mutated. The threading probe is
/// performed lazily, memoized, and can never fail the caller: a probe error
/// logs a warning and the conservative single-threaded path is used.
#[derive(Debug)]
pub struct CapabilityDetector {
    threads: usize,
    threading: OnceLock<bool>,
}

impl CapabilityDetector {
    /// Detector with an explicit hardware-concurrency hint.
    pub fn new(threads: usize) -> Self {
        Self {
            threads: threads.max(1),
            threading: OnceLock::new(),
        }
    }

    /// Detector with the hint taken from the environment.
    ///
    /// Detection failure is best-effort: it logs a warning and assumes a
    /// single core, never aborting startup. Restricted runtimes are allowed
    /// to reject the query.
    pub fn from_env() -> Self {
        let threads = match thread::available_parallelism() {
            Ok(n) => n.get(),
            Err(error) => {
                warn!(%error, "failed to detect hardware concurrency, assuming 1");
                1
            }
        };
        Self::new(threads)
    }

    /// Detector with a forced probe result, for hosts that already know
    /// their runtime restrictions.
    pub fn with_threading(threads: usize, available: bool) -> Self {
        let detector = Self::new(threads);
        let _ = detector.threading.set(available);
        detector
    }

    /// The resolved hardware-concurrency hint. Always at least 1.
    pub fn hardware_concurrency(&self) -> usize {
        self.threads
    }

    /// Whether the runtime can actually create execution threads.
    ///
    /// The first call performs the probe; the result is cached for the
    /// lifetime of the detector.
    pub fn threading_available(&self) -> bool {
        *self.threading.get_or_init(|| {
            match thread::Builder::new()
                .name("sandcodecs-probe".into())
                .spawn(|| {})
            {
                Ok(handle) => {
                    let _ = handle.join();
                    true
                }
                Err(error) => {
                    warn!(%error, "threading probe failed, using single-threaded backends");
                    false
                }
            }
        })
    }
}

impl Default for CapabilityDetector {
    fn default() -> Self {
        Self::from_env()
    }
}
