//! Shared fixtures for the service tests.
#![allow(dead_code)]

use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use lookout::ServiceConfig;
use lookout_cluster::{BrokerStatus, ClusterClient, ClusterConfig};
use lookout_common::Signal;
use lookout_metrics::{Metrics, MetricsError};
use lookout_server::HttpServerConfig;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::broadcast,
    task::JoinHandle,
};

/// A cluster client that answers from fixed broker data.
///
/// Reachability can be flipped while a service runs, and every dial is counted.
pub struct FakeCluster {
    pub brokers: Vec<BrokerStatus>,
    reachable: AtomicBool,
    dials: AtomicUsize,
}

impl FakeCluster {
    pub fn new(brokers: &[(&str, bool)]) -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(brokers.iter().any(|(_, reachable)| *reachable)),
            dials: AtomicUsize::new(0),
            brokers: brokers
                .iter()
                .map(|(address, reachable)| BrokerStatus {
                    address: (*address).to_string(),
                    reachable: *reachable,
                    last_checked_at: Some(Utc::now()),
                    last_error: (!reachable).then(|| "connection refused".to_string()),
                })
                .collect(),
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// How many times `is_reachable` has been called
    pub fn dials(&self) -> usize {
        self.dials.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClusterClient for FakeCluster {
    fn client_id(&self) -> &str {
        "fake"
    }

    fn brokers(&self) -> Arc<[BrokerStatus]> {
        self.brokers.clone().into()
    }

    async fn is_reachable(&self) -> bool {
        self.dials.fetch_add(1, Ordering::SeqCst);
        self.reachable.load(Ordering::SeqCst)
    }

    fn register_metrics(&self, _metrics: &Metrics) -> Result<(), MetricsError> {
        Ok(())
    }

    fn start(self: Arc<Self>, mut shutdown: broadcast::Receiver<Signal>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
        })
    }
}

/// A listener standing in for a broker
pub async fn broker() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    (listener, addr)
}

/// An address nothing listens on
pub async fn dead_address() -> SocketAddr {
    let (listener, addr) = broker().await;
    drop(listener);
    addr
}

pub fn service_config(brokers: &[SocketAddr], http_port: u16) -> ServiceConfig {
    ServiceConfig {
        cluster: ClusterConfig {
            brokers: brokers.iter().map(ToString::to_string).collect(),
            dial_timeout_secs: 2,
            ..ClusterConfig::default()
        },
        http_server: HttpServerConfig {
            listen_address: "127.0.0.1".to_string(),
            listen_port: http_port,
            graceful_shutdown_timeout_secs: 1,
            ..HttpServerConfig::default()
        },
        metrics_namespace: "lookout_test".to_string(),
        ..ServiceConfig::default()
    }
}

/// Issue a bare HTTP/1.1 GET and return status code and body
pub async fn http_get(addr: SocketAddr, path: &str) -> (u16, String) {
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

    let status = response
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse().ok())
        .expect("status line");
    let body = response
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();

    (status, body)
}

/// Wait until something accepts connections on `addr`
pub async fn wait_for_listener(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("nothing started listening on {addr}");
}
