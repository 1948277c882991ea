//! Broker cluster client for Lookout
//!
//! The service only needs a narrow view of the cluster: whether brokers are
//! reachable, what the client last learned about them, and a background task
//! that keeps that knowledge fresh. [`ClusterClient`] is that view;
//! [`BrokerClient`] implements it by dialling the configured brokers (over
//! TLS when enabled).
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use lookout_cluster::{BrokerClient, ClusterClient, ClusterConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClusterConfig {
//!     brokers: vec!["kafka-0:9092".to_string()],
//!     ..ClusterConfig::default()
//! };
//!
//! let client: Arc<dyn ClusterClient> = Arc::new(BrokerClient::connect(&config).await?);
//! assert!(client.is_reachable().await);
//! # Ok(())
//! # }
//! ```

mod broker;
mod client;
mod config;
mod error;
mod tls;

use std::sync::Arc;

use async_trait::async_trait;
use lookout_common::Signal;
use lookout_metrics::{Metrics, MetricsError};
use tokio::{sync::broadcast, task::JoinHandle};

pub use broker::{BrokerAddress, BrokerStatus};
pub use client::BrokerClient;
pub use config::{ClusterConfig, ClusterTlsConfig};
pub use error::{ConnectionError, DialError};

/// Connection to the broker cluster, as seen by the rest of the service.
#[async_trait]
pub trait ClusterClient: Send + Sync + 'static {
    /// Identifier presented to the cluster
    fn client_id(&self) -> &str;

    /// What the client last learned about each broker.
    ///
    /// Never touches the network.
    fn brokers(&self) -> Arc<[BrokerStatus]>;

    /// Whether at least one broker accepts a connection right now.
    ///
    /// Does not change the stored broker metadata.
    async fn is_reachable(&self) -> bool;

    /// Register the client's instruments.
    ///
    /// # Errors
    ///
    /// Returns an error if metrics were already registered.
    fn register_metrics(&self, metrics: &Metrics) -> Result<(), MetricsError>;

    /// Start background maintenance, which runs until `shutdown` fires.
    fn start(self: Arc<Self>, shutdown: broadcast::Receiver<Signal>) -> JoinHandle<()>;
}
