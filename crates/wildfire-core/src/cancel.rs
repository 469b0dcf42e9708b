//! One-shot cancellation signal shared between a session's loop and the
//! parties allowed to stop it.
//!
//! The signal is an [`AtomicBool`] paired with a [`Notify`], the same shape
//! the loop uses to sleep: waiting on [`CancelSignal::cancelled`] can sit
//! inside a `tokio::select!` next to the tick timer and wins as soon as
//! [`CancelSignal::cancel`] is called, without waiting for the timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Cloneable handle to a single cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    /// A fresh, un-fired signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal and wake every waiter.
    ///
    /// Returns `true` the first time and `false` on every later call.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::AcqRel);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Wait until the signal fires. Returns immediately if it already has.
    pub async fn cancelled(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent cancel
            // cannot slip between the check and the await.
            notified.as_mut().enable();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
