//! Shared slot for the currently connected TCP client.
//!
//! The accept loop is the sole writer of this slot (bind on accept, unbind
//! on disconnect); the outbound pump is the sole reader. Neither side ever
//! holds a lock across an await point: the slot itself is swapped
//! atomically, and write access to the socket is gated by a per-connection
//! mutex that is only ever contended by the unbind path racing a send that
//! is about to be abandoned anyway.

use arc_swap::ArcSwapOption;
use compio::net::{OwnedWriteHalf, TcpStream};
use event_listener::Event;
use std::sync::{Arc, Mutex};

/// Handle to the TCP client currently bound to the bridge, if any.
pub struct RemoteContext {
    writer: ArcSwapOption<Mutex<OwnedWriteHalf<TcpStream>>>,
    established: Event,
}

impl Default for RemoteContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteContext {
    #[must_use]
    pub fn new() -> Self {
        Self {
            writer: ArcSwapOption::from(None),
            established: Event::new(),
        }
    }

    /// Bind a newly accepted client's write half and signal any pump
    /// waiting on connection establishment.
    pub fn bind(&self, write_half: OwnedWriteHalf<TcpStream>) {
        self.writer.store(Some(Arc::new(Mutex::new(write_half))));
        self.established.notify(usize::MAX);
    }

    /// Unbind the current client, if any.
    pub fn unbind(&self) {
        self.writer.store(None);
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.writer.load().is_some()
    }

    /// The currently bound write half, if a client is connected.
    #[must_use]
    pub fn current(&self) -> Option<Arc<Mutex<OwnedWriteHalf<TcpStream>>>> {
        self.writer.load_full()
    }

    /// Resolve the next time a client is bound. Intended to be raced
    /// against a pending pipe read so the outbound pump can re-evaluate
    /// the ring as soon as a peer appears, not only on the next chunk.
    ///
    /// Checks `is_connected()` both before and after registering the
    /// listener, the same arm-then-check pattern as `CancelToken::cancelled`:
    /// a `bind()` that fires while the caller is away doing something else
    /// (e.g. mid-flush) would otherwise be a lost wakeup, since a fresh
    /// `wait_for_connection()` future is constructed on every loop
    /// iteration and has no memory of notifies that happened before it
    /// existed.
    pub async fn wait_for_connection(&self) {
        loop {
            let listener = self.established.listen();
            if self.is_connected() {
                return;
            }
            listener.await;
            if self.is_connected() {
                return;
            }
        }
    }
}
