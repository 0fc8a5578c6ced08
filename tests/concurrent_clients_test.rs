//! Concurrency tests: simultaneous clients must never receive each other's
//! responses, because every request owns a dedicated upstream connection.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

use chatrelay::{Config, ConnectionManager};

/// Fake central server that echoes the first received line back, so each
/// response is distinguishable per request.
async fn spawn_echo_central() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let (stream, _) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(_) => break,
            };
            tokio::spawn(async move {
                let (read_half, mut write_half) = stream.into_split();
                let mut lines = BufReader::new(read_half).lines();
                if let Ok(Some(line)) = lines.next_line().await {
                    let _ = write_half.write_all(format!("{}\n", line).as_bytes()).await;
                }
            });
        }
    });

    addr
}

async fn start_relay(central_addr: SocketAddr) -> SocketAddr {
    let mut config = Config::default();
    config.server.bind_addr = "127.0.0.1:0".parse().unwrap();
    config.upstream.addr = central_addr;

    let mut manager = ConnectionManager::new(Arc::new(config));
    let relay_addr = manager.bind().await.unwrap();

    tokio::spawn(async move {
        let _ = manager.start().await;
    });

    relay_addr
}

#[tokio::test]
async fn concurrent_clients_get_their_own_responses() {
    let central_addr = spawn_echo_central().await;
    let relay_addr = start_relay(central_addr).await;

    let num_clients = 8;
    let mut handles = Vec::new();

    for i in 0..num_clients {
        handles.push(tokio::spawn(async move {
            let stream = TcpStream::connect(relay_addr).await.unwrap();
            let (read_half, mut write_half) = stream.into_split();
            let mut responses = BufReader::new(read_half).lines();

            let request = format!("{{\"type\":\"CONSULTAR_CUENTA\",\"account\":{}}}", i);
            write_half
                .write_all(format!("{}\n", request).as_bytes())
                .await
                .unwrap();

            let response = timeout(Duration::from_secs(5), responses.next_line())
                .await
                .expect("response timed out")
                .unwrap()
                .unwrap();

            (request, response)
        }));
    }

    for handle in handles {
        let (request, response) = handle.await.unwrap();
        assert_eq!(response, request, "response crossed between clients");
    }
}

#[tokio::test]
async fn connection_limit_rejects_excess_clients() {
    let central_addr = spawn_echo_central().await;

    let mut config = Config::default();
    config.server.bind_addr = "127.0.0.1:0".parse().unwrap();
    config.upstream.addr = central_addr;
    config.server.max_connections = 1;

    let mut manager = ConnectionManager::new(Arc::new(config));
    let relay_addr = manager.bind().await.unwrap();
    tokio::spawn(async move {
        let _ = manager.start().await;
    });

    // First client occupies the only slot
    let stream = TcpStream::connect(relay_addr).await.unwrap();
    let (read_half, mut write_half) = stream.into_split();
    let mut responses = BufReader::new(read_half).lines();
    write_half.write_all(b"first\n").await.unwrap();
    let response = timeout(Duration::from_secs(5), responses.next_line())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(response, "first");

    // Second client connects while the first is still open; its request is
    // never served and the connection is dropped by the relay
    let second = TcpStream::connect(relay_addr).await.unwrap();
    let (second_read, mut second_write) = second.into_split();
    let mut second_responses = BufReader::new(second_read).lines();
    let _ = second_write.write_all(b"second\n").await;

    let outcome = timeout(Duration::from_secs(2), second_responses.next_line()).await;
    match outcome {
        Ok(Ok(None)) => {}
        Ok(Ok(Some(line))) => panic!("rejected client unexpectedly got a response: {}", line),
        Ok(Err(_)) => {}
        Err(_) => panic!("rejected client was left hanging instead of being dropped"),
    }
}
