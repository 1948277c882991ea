//! Serving and draining against real sockets.
#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::{net::SocketAddr, time::Duration};

use axum::{Router, routing::get};
use lookout_common::Signal;
use lookout_server::{HttpServerConfig, RestServer, ServerError};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::broadcast,
};

fn local_config() -> HttpServerConfig {
    HttpServerConfig {
        listen_address: "127.0.0.1".to_string(),
        listen_port: 0,
        graceful_shutdown_timeout_secs: 1,
        ..HttpServerConfig::default()
    }
}

fn routes() -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(60)).await;
                "late"
            }),
        )
}

async fn get_path(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("connect");
    stream
        .write_all(format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n").as_bytes())
        .await
        .expect("write request");

    let mut response = String::new();
    stream
        .read_to_string(&mut response)
        .await
        .expect("read response");
    response
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Network operations not supported in MIRI")]
async fn test_serves_routes_until_shutdown() {
    let server = RestServer::bind(&local_config(), routes())
        .await
        .expect("bind");
    let addr = server.local_addr();
    let (shutdown, receiver) = broadcast::channel(1);
    let serving = tokio::spawn(server.serve(receiver));

    let response = get_path(addr, "/ping").await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.ends_with("pong"), "{response}");

    shutdown.send(Signal::Shutdown).expect("receiver alive");
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("server stops")
        .expect("task")
        .expect("clean shutdown");

    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Network operations not supported in MIRI")]
async fn test_drain_is_bounded_by_graceful_timeout() {
    let server = RestServer::bind(&local_config(), routes())
        .await
        .expect("bind");
    let addr = server.local_addr();
    let (shutdown, receiver) = broadcast::channel(1);
    let serving = tokio::spawn(server.serve(receiver));

    let in_flight = tokio::spawn(get_path(addr, "/slow"));
    tokio::time::sleep(Duration::from_millis(200)).await;

    shutdown.send(Signal::Shutdown).expect("receiver alive");
    tokio::time::timeout(Duration::from_secs(5), serving)
        .await
        .expect("drain gives up after one second")
        .expect("task")
        .expect("abandoning a drain is not an error");

    in_flight.abort();
}

#[tokio::test]
#[cfg_attr(miri, ignore = "Network operations not supported in MIRI")]
async fn test_bind_conflict_is_reported() {
    let first = RestServer::bind(&local_config(), routes())
        .await
        .expect("bind");

    let config = HttpServerConfig {
        listen_port: first.local_addr().port(),
        ..local_config()
    };
    let err = RestServer::bind(&config, routes())
        .await
        .expect_err("port in use");

    match err {
        ServerError::Bind { address, .. } => {
            assert_eq!(address, first.local_addr().to_string());
        }
        other => panic!("expected Bind, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected_before_binding() {
    let config = HttpServerConfig {
        listen_address: "not-an-ip".to_string(),
        ..local_config()
    };

    assert!(matches!(
        RestServer::bind(&config, routes()).await,
        Err(ServerError::Configuration(_))
    ));
}
