//! Shared network connectivity state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "is the network reachable" flag.
///
/// The host application flips it; the policy engine only reads it to skip
/// network attempts that cannot succeed. Clones share the same flag.
///
/// Reads are relaxed: a stale value costs at most one failed attempt.
///
/// ```
/// use cachecall_core::Connectivity;
///
/// let connectivity = Connectivity::default();
/// let engine_view = connectivity.clone();
///
/// connectivity.set_connected(false);
/// assert!(!engine_view.is_connected());
/// ```
#[derive(Debug, Clone)]
pub struct Connectivity {
    connected: Arc<AtomicBool>,
}

impl Connectivity {
    /// Creates a flag with the given initial state.
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    /// Returns the last state set by the host application.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Updates the state.
    #[inline]
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::Relaxed);
    }
}

/// Starts connected.
impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}
