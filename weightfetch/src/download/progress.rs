//! Progress reporting and interrupt signalling for transfers.
//!
//! Transfers run on the main thread; the only state shared with another
//! thread is the [`InterruptFlag`], which a Ctrl-C handler sets.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Receives byte-level progress for one transfer at a time.
///
/// Positions are absolute byte offsets in the destination file, so a resumed
/// transfer starts at the size of the partial file rather than zero.
pub trait TransferProgress {
    /// A transfer is starting.
    ///
    /// * `label` - File name being transferred
    /// * `position` - Bytes already on disk
    /// * `total` - Expected final size, 0 if unknown
    fn begin(&self, _label: &str, _position: u64, _total: u64) {}

    /// Bytes on disk after the latest write.
    fn advance(&self, _position: u64) {}

    /// The transfer ended, successfully or not.
    fn finish(&self) {}
}

/// Discards all progress updates.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl TransferProgress for NoProgress {}

/// Cooperative interrupt shared between a signal handler and the transfers.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag {
    requested: Arc<AtomicBool>,
    active_transfers: Arc<AtomicUsize>,
}

impl InterruptFlag {
    /// Create a flag with no interrupt requested.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an interrupt. Returns whether one was already pending.
    pub fn request(&self) -> bool {
        self.requested.swap(true, Ordering::SeqCst)
    }

    /// Whether an interrupt has been requested.
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Whether a transfer or guarded write is running and will observe the flag.
    pub fn in_transfer(&self) -> bool {
        self.active_transfers.load(Ordering::SeqCst) > 0
    }

    /// Mark a transfer, or a write that must not be cut short, as active until
    /// the guard is dropped.
    pub fn transfer_guard(&self) -> TransferGuard {
        self.active_transfers.fetch_add(1, Ordering::SeqCst);
        TransferGuard {
            active_transfers: Arc::clone(&self.active_transfers),
        }
    }
}

/// Keeps [`InterruptFlag::in_transfer`] true while alive.
#[derive(Debug)]
pub struct TransferGuard {
    active_transfers: Arc<AtomicUsize>,
}

impl Drop for TransferGuard {
    fn drop(&mut self) {
        self.active_transfers.fetch_sub(1, Ordering::SeqCst);
    }
}
