//! Inbound pump: socket → inbound pipe.
//!
//! Runs for exactly the lifetime of one accepted connection. Reading and
//! committing bytes never blocks on the consumer; only the post-commit
//! pacing wait is subject to `bridge_timeout`, so a stalled `Incoming`
//! reader cannot wedge the socket-reading loop (it can only delay how
//! quickly backpressure is communicated upstream).

use crate::runtime::RuntimeOptions;
use bridge_core::alloc::{IoArena, PAGE_SIZE};
use bridge_core::cancel::CancelToken;
use bridge_core::pipe::Pipe;
use compio::io::{AsyncRead, AsyncReadExt};
use compio::net::{OwnedReadHalf, TcpStream};
use futures::FutureExt;
use std::io;
use std::sync::Arc;

const READ_CHUNK: usize = 8192;

/// Why the inbound pump stopped running.
#[derive(Debug)]
pub enum PumpInExit {
    /// The peer sent FIN.
    Eof,
    /// A socket read failed.
    SocketError(io::Error),
    /// The bridge is disposing.
    Cancelled,
    /// The inbound pipe's consumer is gone.
    PipeClosed,
}

/// Drive bytes from `read_half` into `pipe` until the connection ends,
/// the pipe closes, or the bridge is cancelled.
///
/// `bridge_timeout` is read fresh on every iteration so runtime mutation
/// of the option takes effect by the next flush.
pub async fn run(
    mut read_half: OwnedReadHalf<TcpStream>,
    pipe: Arc<Pipe>,
    cancel: Arc<CancelToken>,
    runtime: Arc<RuntimeOptions>,
) -> PumpInExit {
    let mut arena = IoArena::new();

    loop {
        if cancel.is_cancelled() {
            return PumpInExit::Cancelled;
        }

        let slab = arena.alloc_mut(READ_CHUNK.min(PAGE_SIZE));
        let read_outcome = futures::select! {
            res = read_half.read(slab).fuse() => Some(res),
            () = cancel.cancelled().fuse() => None,
        };

        let compio::buf::BufResult(result, slab) = match read_outcome {
            Some(outcome) => outcome,
            None => return PumpInExit::Cancelled,
        };

        let n = match result {
            Ok(0) => return PumpInExit::Eof,
            Ok(n) => n,
            Err(e) => return PumpInExit::SocketError(e),
        };

        let chunk = slab.freeze();
        debug_assert_eq!(chunk.len(), n);
        if pipe.push(chunk).is_err() {
            return PumpInExit::PipeClosed;
        }

        // Post-commit pacing: wait for the reader to drain below
        // threshold, but never longer than bridge_timeout. A timeout here
        // drops nothing; it just means this iteration's pacing wait was
        // abandoned.
        futures::select! {
            () = pipe.flush().fuse() => {}
            () = compio::time::sleep(runtime.bridge_timeout()).fuse() => {}
            () = cancel.cancelled().fuse() => return PumpInExit::Cancelled,
        }
    }
}
