//! Internal error type.
//!
//! Connectivity failures are never surfaced to callers of the bridge;
//! this type exists for the plumbing between the pumps, the pipes, and
//! the accept loop, and ends up only in `tracing` output and the
//! bridge's `last_socket_error` slot.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("pipe closed")]
    PipeClosed,

    #[error("operation timed out after {0:?}")]
    TimedOut(std::time::Duration),

    #[error("bridge disposed")]
    Disposed,
}

impl From<crate::pipe::PipeClosed> for BridgeError {
    fn from(_: crate::pipe::PipeClosed) -> Self {
        Self::PipeClosed
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
