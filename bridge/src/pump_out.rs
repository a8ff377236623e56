//! Outbound pump: outbound pipe → socket, or → ring cache while disconnected.
//!
//! Runs for the entire lifetime of the bridge, connected or not, so a
//! producer writing to `Outgoing` never blocks merely because no peer is
//! currently attached.

use crate::remote::RemoteContext;
use crate::runtime::RuntimeOptions;
use bridge_core::alloc::IoBytes;
use bridge_core::cancel::CancelToken;
use bridge_core::pipe::Pipe;
use bridge_core::ring::RingBuffer;
use bytes::Bytes;
use compio::io::AsyncWriteExt;
use compio::net::{OwnedWriteHalf, TcpStream};
use futures::FutureExt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MAX_CHUNK: usize = 64 * 1024;

type Writer = Arc<Mutex<OwnedWriteHalf<TcpStream>>>;

enum Woken {
    Chunk(Option<bytes::Bytes>),
    Established,
    Cancelled,
}

/// Drive bytes from `pipe` to whichever client is bound in `remote`,
/// caching in `ring` while disconnected, until cancelled or the pipe
/// closes.
pub async fn run(
    pipe: Arc<Pipe>,
    remote: Arc<RemoteContext>,
    cancel: Arc<CancelToken>,
    runtime: Arc<RuntimeOptions>,
    outgoing_cache_bytes: usize,
) {
    let mut ring = RingBuffer::new(outgoing_cache_bytes);

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let woken = futures::select! {
            chunk = pipe.read(MAX_CHUNK).fuse() => Woken::Chunk(chunk),
            () = remote.wait_for_connection().fuse() => Woken::Established,
            () = cancel.cancelled().fuse() => Woken::Cancelled,
        };

        match woken {
            Woken::Cancelled => break,
            Woken::Established => {
                if let Some(writer) = remote.current() {
                    flush_ring(&mut ring, &writer, runtime.bridge_timeout(), &cancel).await;
                }
            }
            Woken::Chunk(None) => break,
            Woken::Chunk(Some(chunk)) => match remote.current() {
                None => {
                    ring.accumulate(&chunk);
                }
                Some(writer) => {
                    send_chunk(&mut ring, &writer, &chunk, runtime.bridge_timeout(), &cancel).await;
                }
            },
        }
    }
}

/// Send the ring's current content (`first` then `second`) and clear it on
/// success. Bounded by `deadline`, linked to bridge disposal. Whatever
/// wasn't actually written back out — whether from an error, a timeout, or
/// cancellation partway through — is retained with `ring.consume(sent)` so
/// the next attempt resumes exactly where this one stopped, rather than
/// retransmitting bytes already delivered to the peer.
async fn flush_ring(ring: &mut RingBuffer, writer: &Writer, deadline: Duration, cancel: &CancelToken) {
    if ring.is_empty() {
        return;
    }
    let first = Bytes::copy_from_slice(ring.spans().0);
    let second = Bytes::copy_from_slice(ring.spans().1);

    let mut sent = 0usize;
    let mut flushed = false;

    let op = async {
        let mut guard = writer.lock().unwrap_or_else(|e| e.into_inner());
        for span in [first, second] {
            if span.is_empty() {
                continue;
            }
            let span_len = span.len();
            let compio::buf::BufResult(res, _) = guard.write(IoBytes::new(span)).await;
            let n = match res {
                Ok(n) => n,
                Err(_) => return,
            };
            sent += n;
            if n < span_len {
                return;
            }
        }
        flushed = true;
    };

    futures::select! {
        () = op.fuse() => {}
        () = compio::time::sleep(deadline).fuse() => {}
        () = cancel.cancelled().fuse() => {}
    }

    if flushed {
        ring.clear();
    } else {
        ring.consume(sent);
    }
}

/// Flush the ring, then send `chunk` to the socket a segment at a time.
/// Any segment that sends fewer bytes than requested stops the loop; the
/// unsent remainder (of the ring flush, if it didn't fully drain, and of
/// the chunk) is folded back into the ring.
async fn send_chunk(
    ring: &mut RingBuffer,
    writer: &Writer,
    chunk: &bytes::Bytes,
    deadline: Duration,
    cancel: &CancelToken,
) {
    let ring_first = Bytes::copy_from_slice(ring.spans().0);
    let ring_second = Bytes::copy_from_slice(ring.spans().1);
    let chunk_owned = chunk.clone();

    let mut sent_ring = 0usize;
    let mut flushed_ring = false;
    let mut sent_chunk = 0usize;

    let op = async {
        let mut guard = writer.lock().unwrap_or_else(|e| e.into_inner());

        for span in [ring_first, ring_second] {
            if span.is_empty() {
                continue;
            }
            let span_len = span.len();
            let compio::buf::BufResult(res, _) = guard.write(IoBytes::new(span)).await;
            let n = match res {
                Ok(n) => n,
                Err(_) => return,
            };
            sent_ring += n;
            if n < span_len {
                return;
            }
        }
        flushed_ring = true;

        let compio::buf::BufResult(res, _) = guard.write(IoBytes::new(chunk_owned)).await;
        if let Ok(n) = res {
            sent_chunk = n;
        }
    };

    futures::select! {
        () = op.fuse() => {}
        () = compio::time::sleep(deadline).fuse() => {}
        () = cancel.cancelled().fuse() => {}
    }

    if flushed_ring {
        ring.clear();
    } else {
        ring.consume(sent_ring);
    }

    if sent_chunk < chunk.len() {
        ring.accumulate(&chunk[sent_chunk..]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use compio::io::AsyncReadExt;
    use compio::net::{TcpListener, TcpStream};

    #[compio::test]
    async fn buffers_into_ring_while_disconnected() {
        let pipe = Arc::new(Pipe::new(None));
        let remote = Arc::new(RemoteContext::new());
        let cancel = Arc::new(CancelToken::new());
        let runtime = Arc::new(RuntimeOptions::from_options(
            &bridge_core::options::BridgeOptions::new().with_bridge_timeout(Duration::from_millis(200)),
        ));

        pipe.write(bytes::Bytes::from_static(b"abcdef")).await.unwrap();

        let runner = {
            let pipe = pipe.clone();
            let remote = remote.clone();
            let cancel = cancel.clone();
            compio::runtime::spawn(async move {
                run(pipe, remote, cancel, runtime, 4096).await;
            })
        };

        compio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        runner.await;
    }

    #[compio::test]
    async fn flushes_to_socket_once_connected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let pipe = Arc::new(Pipe::new(None));
        let remote = Arc::new(RemoteContext::new());
        let cancel = Arc::new(CancelToken::new());
        let runtime = Arc::new(RuntimeOptions::from_options(
            &bridge_core::options::BridgeOptions::new().with_bridge_timeout(Duration::from_millis(500)),
        ));

        pipe.write(bytes::Bytes::from_static(b"abcdef")).await.unwrap();

        let runner = {
            let pipe = pipe.clone();
            let remote = remote.clone();
            let cancel = cancel.clone();
            compio::runtime::spawn(async move {
                run(pipe, remote, cancel, runtime, 4096).await;
            })
        };

        let client = compio::runtime::spawn(async move { TcpStream::connect(addr).await.unwrap() });
        let (server_stream, _) = listener.accept().await.unwrap();
        let (_read_half, write_half) = server_stream.into_split();
        remote.bind(write_half);

        let mut client = client.await;
        let mut buf = vec![0u8; 6];
        let compio::buf::BufResult(res, buf) = client.read_exact(buf).await;
        res.unwrap();
        assert_eq!(&buf[..], b"abcdef");

        cancel.cancel();
        runner.await;
    }
}
