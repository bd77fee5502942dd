//! Socket lifecycle over the mock and tokio providers

use std::sync::Arc;
use std::time::Duration;

use rust_inet::config::Config;
use rust_inet::socket::{ConnectOutcome, IoProvider, StreamSocket, TokioIoProvider};
use rust_inet::{InetError, IpAddress, SocketAddress};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use super::Harness;

fn remote(port: u16) -> SocketAddress {
    SocketAddress::new("192.0.2.80".parse().unwrap(), port)
}

#[tokio::test]
async fn test_full_stream_lifecycle() {
    let harness = Harness::new(Config::default());
    let socket = harness.context.stream_socket().unwrap();

    socket.connect(&remote(80), 1000).await.unwrap();
    assert!(socket.is_bound());
    assert!(socket.is_connected());
    assert_eq!(socket.remote_address(), Some(remote(80)));
    assert!(socket.local_address().is_some());

    socket.shutdown_output().unwrap();
    assert!(socket.send(b"late").await.unwrap_err().is_state_error());
    assert!(socket.shutdown_output().unwrap_err().is_state_error());

    socket.shutdown_input().unwrap();
    let mut buf = [0u8; 8];
    assert_eq!(socket.receive(&mut buf).await.unwrap(), 0);

    socket.close();
    assert!(harness.io.is_closed(socket.handle()));
    assert!(matches!(
        socket.connect(&remote(80), 0).await,
        Err(InetError::SocketClosed)
    ));
    assert!(matches!(socket.bind(&SocketAddress::wildcard(0)), Err(InetError::SocketClosed)));
}

#[tokio::test]
async fn test_refused_connect_releases_handle() {
    let harness = Harness::new(Config::default());
    harness.io.set_default_outcome(ConnectOutcome::Refuse);
    let socket = harness.context.stream_socket().unwrap();

    let err = socket.connect(&remote(81), 1000).await.unwrap_err();
    assert!(err.is_connection_refused());
    assert!(!socket.is_connected());
    assert!(!socket.is_closed());
    assert!(harness.io.is_closed(socket.handle()));
}

#[tokio::test]
async fn test_racing_connects_only_one_attempt() {
    let harness = Harness::new(Config::default());
    harness.io.set_connect_delay(100);
    let socket = Arc::new(harness.context.stream_socket().unwrap());

    let first = {
        let socket = Arc::clone(&socket);
        tokio::spawn(async move { socket.connect(&remote(82), 0).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    let second = socket.connect(&remote(82), 0).await;

    assert!(second.unwrap_err().is_state_error());
    first.await.unwrap().unwrap();
    assert_eq!(harness.io.connect_attempts(), 1);
}

#[tokio::test]
async fn test_close_during_connect_reports_closed() {
    let harness = Harness::new(Config::default());
    harness.io.set_connect_delay(100);
    let socket = Arc::new(harness.context.stream_socket().unwrap());

    let pending = {
        let socket = Arc::clone(&socket);
        tokio::spawn(async move { socket.connect(&remote(83), 0).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    socket.close();

    assert!(matches!(pending.await.unwrap(), Err(InetError::SocketClosed)));
    assert!(socket.is_closed());
    assert!(!socket.is_connected());
}

#[tokio::test]
async fn test_close_during_failing_connect_reports_closed() {
    let harness = Harness::new(Config::default());
    harness.io.set_default_outcome(ConnectOutcome::Unreachable);
    harness.io.set_connect_delay(3000);
    let socket = Arc::new(harness.context.stream_socket().unwrap());

    let pending = {
        let socket = Arc::clone(&socket);
        tokio::spawn(async move { socket.connect(&remote(84), 3000).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    socket.close();

    let err = tokio::time::timeout(Duration::from_secs(1), pending)
        .await
        .expect("connect returns as soon as the socket closes")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, InetError::SocketClosed));
}

#[tokio::test]
async fn test_stream_over_tokio_loopback() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 4];
        stream.read_exact(&mut buf).await.unwrap();
        stream.write_all(&buf).await.unwrap();
    });

    let provider: Arc<dyn IoProvider> = Arc::new(TokioIoProvider::new());
    let socket = StreamSocket::new(provider).unwrap();
    socket.set_receive_timeout(5000).unwrap();
    socket
        .connect(&SocketAddress::new(IpAddress::loopback_v4(), port), 5000)
        .await
        .unwrap();
    assert_eq!(socket.local_address().unwrap().ip(), &IpAddress::loopback_v4());

    socket.send(b"ping").await.unwrap();
    let mut buf = [0u8; 4];
    let mut read = 0;
    while read < buf.len() {
        let n = socket.receive(&mut buf[read..]).await.unwrap();
        assert!(n > 0);
        read += n;
    }
    assert_eq!(&buf, b"ping");

    server.await.unwrap();
    socket.close();
}

#[tokio::test]
async fn test_datagram_default_peer() {
    let harness = Harness::new(Config::default());
    let socket = harness.context.datagram_socket().unwrap();
    let dns = remote(53);

    socket.connect(&dns).await.unwrap();
    socket.send(b"query").await.unwrap();
    assert!(socket.connect(&remote(54)).await.unwrap_err().is_state_error());

    harness.io.push_incoming(b"answer", dns.clone());
    let mut buf = [0u8; 16];
    let n = socket.receive(&mut buf).await.unwrap();
    assert_eq!(&buf[..n], b"answer");

    socket.disconnect().unwrap();
    socket.connect(&remote(54)).await.unwrap();
    assert_eq!(socket.remote_address(), Some(remote(54)));
}
