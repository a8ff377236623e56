//! External stream handles: the only surface a bridge consumer/producer
//! ever touches.
//!
//! Both handles wrap a [`Pipe`] behind a read-only or write-only facade
//! so a local application can treat the bridge as a pair of ordinary
//! byte streams, oblivious to whatever TCP churn is happening behind
//! them.

use bridge_core::pipe::{Pipe, PipeClosed};
use bytes::Bytes;
use std::sync::Arc;

/// Read-only handle onto the bridge's inbound pipe.
#[derive(Clone)]
pub struct Incoming {
    pipe: Arc<Pipe>,
}

impl Incoming {
    pub(crate) fn new(pipe: Arc<Pipe>) -> Self {
        Self { pipe }
    }

    /// Read up to `max` bytes, waiting for at least one if none are
    /// queued yet. Returns `None` once the bridge has disposed and the
    /// pipe is drained.
    pub async fn read(&self, max: usize) -> Option<Bytes> {
        self.pipe.read(max).await
    }

    /// Drain whatever is currently queued without waiting for more.
    #[must_use]
    pub fn try_read(&self, max: usize) -> Option<Bytes> {
        self.pipe.try_read(max)
    }

    /// Bytes currently queued but not yet read.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pipe.pending()
    }

    /// Close the inbound pipe independent of bridge disposal. The accept
    /// loop's current inbound pump observes this on its next push and
    /// stops the loop, which then settles and tears down the outbound
    /// pump the same way full disposal does.
    pub fn close(&self) {
        self.pipe.close();
    }
}

/// Write-only handle onto the bridge's outbound pipe.
#[derive(Clone)]
pub struct Outgoing {
    pipe: Arc<Pipe>,
}

impl Outgoing {
    pub(crate) fn new(pipe: Arc<Pipe>) -> Self {
        Self { pipe }
    }

    /// Write `chunk`, backpressuring if the outbound pipe is over its
    /// configured threshold. Bytes handed here are delivered to whatever
    /// peer is connected when the outbound pump gets to them, or cached
    /// in the ring if none is.
    ///
    /// # Errors
    ///
    /// Fails if the bridge has been disposed.
    pub async fn write(&self, chunk: Bytes) -> Result<(), PipeClosed> {
        self.pipe.write(chunk).await
    }

    /// Bytes currently queued but not yet picked up by the outbound pump.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pipe.pending()
    }
}
