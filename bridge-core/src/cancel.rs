//! Bridge-wide cancellation.
//!
//! A single [`CancelToken`] is shared by the accept loop and both pumps.
//! Tripping it wakes every task currently waiting on `cancelled()` so
//! disposal does not have to wait out whatever timeout each task happens
//! to be blocked on.

use event_listener::Event;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct CancelToken {
    fired: AtomicBool,
    event: Event,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Trip the token. Idempotent: firing twice is a no-op after the first.
    pub fn cancel(&self) {
        if !self.fired.swap(true, Ordering::AcqRel) {
            self.event.notify(usize::MAX);
        }
    }

    /// Resolve once the token has been cancelled.
    pub async fn cancelled(&self) {
        loop {
            let listener = self.event.listen();
            if self.is_cancelled() {
                return;
            }
            listener.await;
            if self.is_cancelled() {
                return;
            }
        }
    }
}
