//! # Bridge
//!
//! A persistent TCP-to-stream bridge built on `io_uring`.
//!
//! Exposes a single-client TCP listener behind a pair of local byte
//! streams, `Incoming` and `Outgoing`, that stay open for the lifetime
//! of the bridge regardless of how many times the remote peer connects
//! and disconnects. Bytes written to `Outgoing` are delivered to
//! whichever client is currently connected, or cached in a bounded ring
//! if none is; bytes received from the current client are delivered to
//! `Incoming` in order.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # async fn example() -> std::io::Result<()> {
//! use bridge::new_bridge;
//!
//! let endpoint = "127.0.0.1:9001".parse().unwrap();
//! let b = new_bridge(endpoint, None);
//!
//! b.outgoing().write(bytes::Bytes::from_static(b"hello")).await.ok();
//! if let Some(chunk) = b.incoming().read(4096).await {
//!     println!("received {} bytes", chunk.len());
//! }
//!
//! b.dispose_async().await;
//! # Ok(())
//! # }
//! ```

pub mod accept;
pub mod bridge;
pub mod dev_tracing;
pub mod pump_in;
pub mod pump_out;
pub mod remote;
pub mod runtime;
pub mod streams;

pub use bridge::{new_bridge, Bridge};
pub use bridge_core::options::BridgeOptions;
pub use streams::{Incoming, Outgoing};
