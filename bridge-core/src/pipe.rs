//! Backpressured byte pipe.
//!
//! A [`Pipe`] is a single-producer, single-consumer bounded byte queue.
//! Bytes are appended in whole chunks and drained in arbitrary-sized
//! reads, in strict FIFO order. Once the number of pending bytes passes
//! `pause_writer_threshold`, the next `write` suspends until the consumer
//! has drained enough to fall back under the threshold; with no
//! threshold configured the pipe never backpressures its producer.
//!
//! This is the glue between the long-lived external streams
//! (`Incoming`/`Outgoing`) and the transient socket pumps: it lets a
//! producer and consumer run on independent schedules without either one
//! blocking the other except by explicit, bounded design.

use crate::buffer::SegmentedBuffer;
use bytes::Bytes;
use event_listener::Event;
use std::sync::Mutex;

#[derive(Debug, Default)]
struct State {
    data: SegmentedBuffer,
    closed: bool,
}

/// A bounded, single-producer single-consumer byte pipe.
pub struct Pipe {
    state: Mutex<State>,
    threshold: Option<usize>,
    not_empty: Event,
    not_full: Event,
}

impl Pipe {
    /// Create a pipe. `pause_writer_threshold` of `None` means writes
    /// never backpressure regardless of how much data piles up.
    #[must_use]
    pub fn new(pause_writer_threshold: Option<usize>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            threshold: pause_writer_threshold,
            not_empty: Event::new(),
            not_full: Event::new(),
        }
    }

    /// Bytes currently queued but not yet consumed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).data.len()
    }

    fn over_threshold(state: &State, threshold: Option<usize>) -> bool {
        match threshold {
            Some(t) => state.data.len() > t,
            None => false,
        }
    }

    /// Append `chunk` to the pipe, waiting first if the pipe is already
    /// over its backpressure threshold.
    ///
    /// Returns an error if the pipe has been closed (the consumer end is
    /// gone, or the bridge has shut down).
    pub async fn write(&self, chunk: Bytes) -> Result<(), PipeClosed> {
        if chunk.is_empty() {
            return Ok(());
        }
        loop {
            let listener = {
                let guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if guard.closed {
                    return Err(PipeClosed);
                }
                if !Self::over_threshold(&guard, self.threshold) {
                    break;
                }
                self.not_full.listen()
            };
            listener.await;
        }

        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if guard.closed {
            return Err(PipeClosed);
        }
        guard.data.push(chunk);
        drop(guard);
        self.not_empty.notify(usize::MAX);
        Ok(())
    }

    /// Append `chunk` unconditionally, ignoring the backpressure threshold.
    ///
    /// Pairs with [`Pipe::flush`] as a two-step commit: the push itself
    /// never blocks and never drops bytes, so a consumer that stalls can
    /// only delay the *pacing* wait, not the delivery of bytes already
    /// read off the socket.
    pub fn push(&self, chunk: Bytes) -> Result<(), PipeClosed> {
        if chunk.is_empty() {
            return Ok(());
        }
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if guard.closed {
            return Err(PipeClosed);
        }
        guard.data.push(chunk);
        drop(guard);
        self.not_empty.notify(usize::MAX);
        Ok(())
    }

    /// Wait until pending bytes fall to or below `threshold`, or until the
    /// pipe closes. Does not remove anything from the pipe; this is the
    /// producer-pacing primitive used by the inbound pump's post-commit
    /// flush (see the module docs on `Pipe::write` for the symmetric
    /// pre-write wait).
    pub async fn wait_drained_below(&self, threshold: usize) {
        loop {
            let listener = {
                let guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if guard.closed || guard.data.len() <= threshold {
                    return;
                }
                self.not_full.listen()
            };
            listener.await;
        }
    }

    /// Wait for this pipe's own configured backpressure threshold to clear.
    /// A no-op if the pipe has no threshold configured.
    pub async fn flush(&self) {
        if let Some(threshold) = self.threshold {
            self.wait_drained_below(threshold).await;
        }
    }

    /// Remove up to `max` bytes from the front of the pipe, waiting if
    /// none are available yet. Returns `None` once the pipe is closed and
    /// drained.
    pub async fn read(&self, max: usize) -> Option<Bytes> {
        loop {
            let listener = {
                let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
                if !guard.data.is_empty() {
                    let take = max.min(guard.data.len());
                    let out = guard.data.take_bytes(take);
                    let now_len = guard.data.len();
                    drop(guard);
                    if self.threshold.is_some_and(|t| now_len <= t) {
                        self.not_full.notify(usize::MAX);
                    }
                    return out;
                }
                if guard.closed {
                    return None;
                }
                self.not_empty.listen()
            };
            listener.await;
        }
    }

    /// Non-blocking drain of whatever is currently queued, without
    /// waiting for more. Used by pumps that must poll the pipe alongside
    /// other cancellable events instead of committing to a single await.
    #[must_use]
    pub fn try_read(&self, max: usize) -> Option<Bytes> {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if guard.data.is_empty() {
            return None;
        }
        let take = max.min(guard.data.len());
        let out = guard.data.take_bytes(take);
        let now_len = guard.data.len();
        drop(guard);
        if self.threshold.is_some_and(|t| now_len <= t) {
            self.not_full.notify(usize::MAX);
        }
        out
    }

    /// Mark both ends closed. Wakes any pending reader/writer so they can
    /// observe the closure instead of hanging forever.
    pub fn close(&self) {
        let mut guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        guard.closed = true;
        drop(guard);
        self.not_empty.notify(usize::MAX);
        self.not_full.notify(usize::MAX);
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).closed
    }
}

/// The pipe has been closed; no further bytes will be accepted or produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipeClosed;

impl std::fmt::Display for PipeClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pipe closed")
    }
}

impl std::error::Error for PipeClosed {}
