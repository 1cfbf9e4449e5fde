//! Interruptible Pauses
//!
//! Every wait in the harness (polling ticks, typing delays, settle pauses)
//! goes through a shared [`Pacer`]. While a snippet executes, or the session
//! runs unattended, the pacer is *armed*; an operator keypress then interrupts
//! the current pause and every following pause until the playback loop takes
//! the interrupt and hands control back, without a timeout error.
//!
//! This is the only module allowed to sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct PacerInner {
    armed: AtomicBool,
    interrupted: AtomicBool,
    notify: Notify,
}

/// Cancellable sleep shared between the playback loop and the keyboard
#[derive(Clone, Debug, Default)]
pub struct Pacer {
    inner: Arc<PacerInner>,
}

impl Pacer {
    /// Create a disarmed pacer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accepting interrupts (a snippet is about to execute)
    pub fn arm(&self) {
        self.inner.interrupted.store(false, Ordering::SeqCst);
        self.inner.armed.store(true, Ordering::SeqCst);
    }

    /// Stop accepting interrupts and forget any pending one
    pub fn disarm(&self) {
        self.inner.armed.store(false, Ordering::SeqCst);
        self.inner.interrupted.store(false, Ordering::SeqCst);
    }

    /// Whether a key press would interrupt playback
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.inner.armed.load(Ordering::SeqCst)
    }

    /// Interrupt the running snippet's pauses
    ///
    /// Returns `false` (and does nothing) when the pacer is not armed, so the
    /// caller can treat the keypress as a regular command instead.
    pub fn interrupt(&self) -> bool {
        if !self.is_armed() {
            return false;
        }
        self.inner.interrupted.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        true
    }

    /// Whether the running snippet was interrupted
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.inner.interrupted.load(Ordering::SeqCst)
    }

    /// Sleep for `duration` unless interrupted
    ///
    /// Returns `true` when the full duration elapsed, `false` when the pause
    /// was cut short by [`Pacer::interrupt`].
    pub async fn pause(&self, duration: Duration) -> bool {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        // Checked after registering, so an interrupt cannot slip in between
        if self.is_interrupted() {
            return false;
        }

        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = notified => false,
        }
    }
}
