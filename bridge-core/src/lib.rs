//! Runtime-agnostic kernel for the TCP stream bridge.
//!
//! This crate holds the pieces that don't need a live socket to make
//! sense: the outgoing ring cache, the backpressured pipe that connects
//! the pumps to the long-lived stream handles, slab allocation for
//! inbound reads, construction-time options, cancellation, and small
//! timeout/TCP helpers. The bridge crate wires these into the actual
//! accept loop and pumps.

pub mod alloc;
pub mod buffer;
pub mod cancel;
pub mod error;
pub mod options;
pub mod pipe;
pub mod ring;
pub mod tcp;
pub mod timeout;

pub mod prelude {
    pub use crate::alloc::{IoArena, SlabMut};
    pub use crate::cancel::CancelToken;
    pub use crate::error::{BridgeError, Result};
    pub use crate::options::BridgeOptions;
    pub use crate::pipe::{Pipe, PipeClosed};
    pub use crate::ring::RingBuffer;
}
