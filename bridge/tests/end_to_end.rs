//! End-to-end scenarios exercising a bridge against real loopback
//! sockets, one scenario per spec scenario from the canonical test set.

use bridge::{new_bridge, BridgeOptions};
use bytes::Bytes;
use compio::io::{AsyncReadExt, AsyncWriteExt};
use compio::net::TcpStream;
use std::time::Duration;

fn free_port() -> std::net::SocketAddr {
    let port = portpicker::pick_unused_port().expect("no free port available");
    format!("127.0.0.1:{port}").parse().unwrap()
}

#[compio::test]
async fn inbound_single_connection_across_reconnect() {
    let addr = free_port();
    let bridge = new_bridge(addr, Some(BridgeOptions::new().with_accept_interval(Duration::from_millis(100))));

    compio::time::sleep(Duration::from_millis(50)).await;
    let mut client = TcpStream::connect(addr).await.unwrap();
    client.write_all(b"abcdef".to_vec()).await.0.unwrap();
    client.write_all(b"ABCDEF".to_vec()).await.0.unwrap();
    compio::time::sleep(Duration::from_millis(500)).await;

    let received = bridge.incoming().read(64).await.unwrap();
    assert_eq!(&received[..], b"abcdefABCDEF");

    drop(client);
    compio::time::sleep(Duration::from_millis(200)).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_all(b"vwxyz".to_vec()).await.0.unwrap();
    second.write_all(b"VWXYZ".to_vec()).await.0.unwrap();
    compio::time::sleep(Duration::from_millis(200)).await;

    let received = bridge.incoming().read(64).await.unwrap();
    assert_eq!(&received[..], b"vwxyzVWXYZ");

    bridge.dispose_async().await;
}

#[compio::test]
async fn inbound_bytes_outlive_disconnect() {
    let addr = free_port();
    let bridge = new_bridge(addr, Some(BridgeOptions::new().with_accept_interval(Duration::from_millis(50))));

    compio::time::sleep(Duration::from_millis(50)).await;
    let mut first = TcpStream::connect(addr).await.unwrap();
    first.write_all(b"abcdef".to_vec()).await.0.unwrap();
    first.write_all(b"ABCDEF".to_vec()).await.0.unwrap();
    drop(first);
    compio::time::sleep(Duration::from_millis(150)).await;

    let mut second = TcpStream::connect(addr).await.unwrap();
    second.write_all(b"vwxyz".to_vec()).await.0.unwrap();
    second.write_all(b"VWXYZ".to_vec()).await.0.unwrap();
    drop(second);
    compio::time::sleep(Duration::from_millis(150)).await;

    let received = bridge.incoming().read(64).await.unwrap();
    assert_eq!(&received[..], b"abcdefABCDEFvwxyzVWXYZ");

    bridge.dispose_async().await;
}

#[compio::test]
async fn inbound_backpressured_bulk_delivers_everything() {
    let addr = free_port();
    let options = BridgeOptions::new()
        .with_pause_writer_threshold_bytes(64 * 1024)
        .with_bridge_timeout(Duration::from_millis(500));
    let bridge = new_bridge(addr, Some(options));

    compio::time::sleep(Duration::from_millis(50)).await;
    let mut client = TcpStream::connect(addr).await.unwrap();

    let blob: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
    let sender = {
        let blob = blob.clone();
        compio::runtime::spawn(async move {
            for _ in 0..10 {
                client.write_all(blob.clone()).await.0.unwrap();
            }
        })
    };

    let incoming = bridge.incoming();
    let mut collected = Vec::with_capacity(10 * 64 * 1024);
    let reader = compio::runtime::spawn(async move {
        while collected.len() < 10 * 64 * 1024 {
            match incoming.read(64 * 1024).await {
                Some(chunk) => collected.extend_from_slice(&chunk),
                None => break,
            }
        }
        collected
    });

    sender.await;
    let collected = reader.await;

    assert_eq!(collected.len(), 10 * 64 * 1024);
    let expected: Vec<u8> = std::iter::repeat(blob).take(10).flatten().collect();
    assert_eq!(collected, expected);

    bridge.dispose_async().await;
}

#[compio::test]
async fn outbound_same_session_then_reconnect() {
    let addr = free_port();
    let bridge = new_bridge(addr, Some(BridgeOptions::new().with_accept_interval(Duration::from_millis(100))));

    let connector = compio::runtime::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    compio::time::sleep(Duration::from_millis(500)).await;
    let mut client = connector.await;

    bridge.outgoing().write(Bytes::from_static(b"abcdef")).await.unwrap();
    bridge.outgoing().write(Bytes::from_static(b"ABCDEF")).await.unwrap();

    let mut buf = vec![0u8; 12];
    let compio::buf::BufResult(res, buf) = client.read_exact(buf).await;
    res.unwrap();
    assert_eq!(&buf[..], b"abcdefABCDEF");

    drop(client);
    compio::time::sleep(Duration::from_millis(300)).await;

    let connector = compio::runtime::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    compio::time::sleep(Duration::from_millis(300)).await;
    let mut second = connector.await;

    bridge.outgoing().write(Bytes::from_static(b"vwxyz")).await.unwrap();
    bridge.outgoing().write(Bytes::from_static(b"VWXYZ")).await.unwrap();

    let mut buf = vec![0u8; 10];
    let compio::buf::BufResult(res, buf) = second.read_exact(buf).await;
    res.unwrap();
    assert_eq!(&buf[..], b"vwxyzVWXYZ");

    bridge.dispose_async().await;
}

#[compio::test]
async fn outbound_buffered_while_disconnected() {
    let addr = free_port();
    let bridge = new_bridge(addr, None);

    bridge.outgoing().write(Bytes::from_static(b"abcdef")).await.unwrap();
    bridge.outgoing().write(Bytes::from_static(b"ABCDEF")).await.unwrap();
    compio::time::sleep(Duration::from_millis(200)).await;
    bridge.outgoing().write(Bytes::from_static(b"vwxyz")).await.unwrap();
    bridge.outgoing().write(Bytes::from_static(b"VWXYZ")).await.unwrap();
    compio::time::sleep(Duration::from_millis(200)).await;

    let connector = compio::runtime::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    compio::time::sleep(Duration::from_millis(500)).await;
    let mut client = connector.await;

    let mut buf = vec![0u8; 22];
    let compio::buf::BufResult(res, buf) = client.read_exact(buf).await;
    res.unwrap();
    assert_eq!(&buf[..], b"abcdefABCDEFvwxyzVWXYZ");

    bridge.dispose_async().await;
}

#[compio::test]
async fn outbound_ring_eviction_keeps_only_the_tail() {
    let addr = free_port();
    let bridge = new_bridge(addr, Some(BridgeOptions::new().with_outgoing_cache_bytes(1024)));

    for i in 0..10u8 {
        let blob = Bytes::from(vec![i; 1024]);
        bridge.outgoing().write(blob).await.unwrap();
    }
    compio::time::sleep(Duration::from_millis(100)).await;

    let connector = compio::runtime::spawn(async move { TcpStream::connect(addr).await.unwrap() });
    compio::time::sleep(Duration::from_millis(300)).await;
    let mut client = connector.await;

    let mut buf = vec![0u8; 1024];
    let compio::buf::BufResult(res, buf) = client.read_exact(buf).await;
    res.unwrap();
    assert_eq!(&buf[..], &vec![9u8; 1024][..]);

    bridge.dispose_async().await;
}
