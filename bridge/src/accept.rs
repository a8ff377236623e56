//! Accept loop: (T1) owns the listener and runs one inbound pump per
//! accepted client, one at a time. Also owns starting the outbound pump
//! (T3) and, after its own drain settle, cancelling it and awaiting its
//! termination — the task handle the bridge stores for the whole T1/T3
//! pair is this function's own `compio::runtime::Task`.

use crate::pump_in::{self, PumpInExit};
use crate::pump_out;
use crate::remote::RemoteContext;
use crate::runtime::RuntimeOptions;
use bridge_core::cancel::CancelToken;
use bridge_core::options::BridgeOptions;
use bridge_core::pipe::Pipe;
use bridge_core::tcp;
use compio::net::TcpListener;
use futures::FutureExt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Wait after the accept loop stops taking new clients, giving a peer
/// shutdown in progress time to deliver its last bytes through the
/// inbound pump before the outbound pump is torn down.
const DRAIN_SETTLE: Duration = Duration::from_millis(500);

/// Run the accept loop until `cancel` fires, then settle and tear down the
/// outbound pump.
///
/// One listener is opened per outer iteration; socket errors and plain
/// disconnects are both handled by recording `last_socket_error` and
/// retrying after `runtime.accept_interval()`. Never returns early on a
/// transient socket failure; only `cancel` (or the inbound pipe closing)
/// ends the loop.
///
/// The outbound pump is spawned here, at the start, and lives under its
/// own `outbound_cancel` token rather than `cancel`: disposal trips
/// `cancel` first to stop taking new clients, then this function sleeps
/// `DRAIN_SETTLE`, and only then trips `outbound_cancel` and awaits the
/// outbound pump's termination. This gives the outbound side a grace
/// window after the accept loop stops, instead of tearing both down in
/// the same instant.
#[allow(clippy::too_many_arguments)]
pub async fn run(
    endpoint: SocketAddr,
    inbound: Arc<Pipe>,
    outbound: Arc<Pipe>,
    remote: Arc<RemoteContext>,
    cancel: Arc<CancelToken>,
    outbound_cancel: Arc<CancelToken>,
    runtime: Arc<RuntimeOptions>,
    options: Arc<BridgeOptions>,
    last_socket_error: Arc<AtomicI32>,
) {
    let outbound_task = compio::runtime::spawn(pump_out::run(
        outbound,
        remote.clone(),
        outbound_cancel.clone(),
        runtime.clone(),
        options.outgoing_cache_bytes(),
    ));

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let listener = match TcpListener::bind(endpoint).await {
            Ok(listener) => listener,
            Err(e) => {
                warn!("bridge accept loop: bind failed: {e}");
                record_error(&last_socket_error, &e);
                if sleep_or_cancelled(runtime.accept_interval(), &cancel).await {
                    break;
                }
                continue;
            }
        };

        let accepted = futures::select! {
            res = listener.accept().fuse() => Some(res),
            () = cancel.cancelled().fuse() => None,
        };

        let (stream, peer_addr) = match accepted {
            None => break,
            Some(Ok(pair)) => pair,
            Some(Err(e)) => {
                warn!("bridge accept loop: accept failed: {e}");
                record_error(&last_socket_error, &e);
                if sleep_or_cancelled(runtime.accept_interval(), &cancel).await {
                    break;
                }
                continue;
            }
        };

        debug!("bridge accept loop: client connected from {peer_addr}");

        if let Err(e) = tcp::configure_socket_buffers(
            &stream,
            options.send_buffer_bytes(),
            options.recv_buffer_bytes(),
        ) {
            warn!("bridge accept loop: failed to apply socket buffer options: {e}");
        }
        let _ = tcp::enable_tcp_nodelay(&stream);
        last_socket_error.store(0, Ordering::Relaxed);

        let (read_half, write_half) = stream.into_split();
        remote.bind(write_half);

        let exit = pump_in::run(read_half, inbound.clone(), cancel.clone(), runtime.clone()).await;
        remote.unbind();

        match exit {
            PumpInExit::Eof => debug!("bridge accept loop: peer {peer_addr} disconnected"),
            PumpInExit::SocketError(e) => {
                warn!("bridge accept loop: socket error from {peer_addr}: {e}");
                record_error(&last_socket_error, &e);
            }
            PumpInExit::PipeClosed => {
                debug!("bridge accept loop: inbound pipe closed, stopping accept loop");
                break;
            }
            PumpInExit::Cancelled => break,
        }

        if sleep_or_cancelled(runtime.accept_interval(), &cancel).await {
            break;
        }
    }

    compio::time::sleep(DRAIN_SETTLE).await;

    outbound_cancel.cancel();
    outbound_task.await;
}

fn record_error(last_socket_error: &AtomicI32, error: &std::io::Error) {
    let code = error.raw_os_error().unwrap_or(-1);
    last_socket_error.store(code, Ordering::Relaxed);
}

/// Sleep for `duration`, racing bridge cancellation. Returns `true` if
/// cancellation won the race.
async fn sleep_or_cancelled(duration: Duration, cancel: &CancelToken) -> bool {
    futures::select! {
        () = compio::time::sleep(duration).fuse() => false,
        () = cancel.cancelled().fuse() => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_core::pipe::Pipe;
    use compio::io::AsyncWriteExt;
    use compio::net::TcpStream;

    #[compio::test]
    async fn accepts_a_client_and_delivers_bytes() {
        let endpoint: SocketAddr = "127.0.0.1:0".parse().unwrap();
        // Bind once up front to reserve a real free port, then immediately
        // drop it so the accept loop's own bind can reuse the address.
        let probe = TcpListener::bind(endpoint).await.unwrap();
        let addr = probe.local_addr().unwrap();
        drop(probe);

        let inbound = Arc::new(Pipe::new(None));
        let outbound = Arc::new(Pipe::new(None));
        let remote = Arc::new(RemoteContext::new());
        let cancel = Arc::new(CancelToken::new());
        let outbound_cancel = Arc::new(CancelToken::new());
        let options = Arc::new(BridgeOptions::new().with_accept_interval(Duration::from_millis(20)));
        let runtime = Arc::new(RuntimeOptions::from_options(&options));
        let last_socket_error = Arc::new(AtomicI32::new(0));

        let loop_handle = {
            let inbound = inbound.clone();
            let outbound = outbound.clone();
            let remote = remote.clone();
            let cancel = cancel.clone();
            let outbound_cancel = outbound_cancel.clone();
            let runtime = runtime.clone();
            let options = options.clone();
            let last_socket_error = last_socket_error.clone();
            compio::runtime::spawn(async move {
                run(
                    addr,
                    inbound,
                    outbound,
                    remote,
                    cancel,
                    outbound_cancel,
                    runtime,
                    options,
                    last_socket_error,
                )
                .await;
            })
        };

        // Give the listener a moment to come up before dialing it.
        compio::time::sleep(Duration::from_millis(20)).await;
        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"abcdef".to_vec()).await.0.unwrap();
        drop(client);

        compio::time::sleep(Duration::from_millis(100)).await;
        assert!(!remote.is_connected());
        assert_eq!(last_socket_error.load(Ordering::Relaxed), 0);

        let received = inbound.try_read(64).unwrap();
        assert_eq!(&received[..], b"abcdef");

        cancel.cancel();
        loop_handle.await;
    }
}
