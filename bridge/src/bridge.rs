//! The bridge instance: construction, runtime-mutable properties, and
//! lifecycle.

use crate::accept;
use crate::remote::RemoteContext;
use crate::runtime::RuntimeOptions;
use crate::streams::{Incoming, Outgoing};
use bridge_core::cancel::CancelToken;
use bridge_core::options::BridgeOptions;
use bridge_core::pipe::Pipe;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

/// A persistent TCP-to-stream bridge.
///
/// Exposes `Incoming`/`Outgoing` byte streams that stay open for the
/// bridge's entire lifetime regardless of how many times the remote TCP
/// client connects and disconnects. See the module-level docs on
/// [`streams`](crate::streams) for the consumer/producer-facing surface.
pub struct Bridge {
    inbound: Arc<Pipe>,
    outbound: Arc<Pipe>,
    remote: Arc<RemoteContext>,
    cancel: Arc<CancelToken>,
    runtime: Arc<RuntimeOptions>,
    last_socket_error: Arc<AtomicI32>,
    disposed: AtomicBool,
    accept_task: Mutex<Option<compio::runtime::Task<()>>>,
}

impl Bridge {
    /// Read-only handle onto bytes received from whichever TCP client is
    /// currently (or was most recently) connected.
    #[must_use]
    pub fn incoming(&self) -> Incoming {
        Incoming::new(self.inbound.clone())
    }

    /// Write-only handle for bytes destined to the TCP client, buffered
    /// in the ring while none is connected.
    #[must_use]
    pub fn outgoing(&self) -> Outgoing {
        Outgoing::new(self.outbound.clone())
    }

    /// Delay between accept attempts after a connection ends or the
    /// listener errors.
    #[must_use]
    pub fn accept_interval(&self) -> Duration {
        self.runtime.accept_interval()
    }

    /// Mutate the accept interval; takes effect on the accept loop's next
    /// iteration.
    pub fn set_accept_interval(&self, interval: Duration) {
        self.runtime.set_accept_interval(interval);
    }

    /// Deadline for a single inbound flush or outbound send.
    #[must_use]
    pub fn bridge_timeout(&self) -> Duration {
        self.runtime.bridge_timeout()
    }

    /// Mutate the bridge timeout; takes effect on each pump's next
    /// iteration.
    pub fn set_bridge_timeout(&self, timeout: Duration) {
        self.runtime.set_bridge_timeout(timeout);
    }

    /// Last non-success error code observed on the accept/listen path.
    /// `0` means none observed yet; `-1` means a non-socket failure.
    #[must_use]
    pub fn last_socket_error(&self) -> i32 {
        self.last_socket_error.load(Ordering::Relaxed)
    }

    /// Shut the bridge down: cancel the accept loop, which in turn settles
    /// and cancels the outbound pump it owns, then complete both pipes and
    /// release resources.
    ///
    /// Idempotent: only the first call does any work; concurrent or
    /// later calls return immediately once the first has taken the gate.
    pub async fn dispose_async(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        debug!("bridge disposing");

        self.cancel.cancel();

        let accept_task = self.accept_task.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(task) = accept_task {
            task.await;
        }

        self.inbound.close();
        self.outbound.close();
        self.remote.unbind();
    }
}

/// Construct a bridge bound to `endpoint`, starting its accept loop and
/// outbound pump immediately. `options` defaults to [`BridgeOptions::new`]
/// when omitted.
#[must_use]
pub fn new_bridge(endpoint: SocketAddr, options: Option<BridgeOptions>) -> Bridge {
    let options = Arc::new(options.unwrap_or_default());
    let inbound = Arc::new(Pipe::new(options.pause_writer_threshold_bytes()));
    let outbound = Arc::new(Pipe::new(options.pause_writer_threshold_bytes()));
    let remote = Arc::new(RemoteContext::new());
    let cancel = Arc::new(CancelToken::new());
    let outbound_cancel = Arc::new(CancelToken::new());
    let runtime = Arc::new(RuntimeOptions::from_options(&options));
    let last_socket_error = Arc::new(AtomicI32::new(0));

    let accept_task = compio::runtime::spawn(accept::run(
        endpoint,
        inbound.clone(),
        outbound.clone(),
        remote.clone(),
        cancel.clone(),
        outbound_cancel,
        runtime.clone(),
        options.clone(),
        last_socket_error.clone(),
    ));

    Bridge {
        inbound,
        outbound,
        remote,
        cancel,
        runtime,
        last_socket_error,
        disposed: AtomicBool::new(false),
        accept_task: Mutex::new(Some(accept_task)),
    }
}
