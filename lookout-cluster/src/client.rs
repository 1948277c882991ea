use std::{
    fmt,
    sync::{Arc, OnceLock},
    time::Duration,
};

use async_trait::async_trait;
use chrono::Utc;
use futures_util::future::{join_all, select_ok};
use lookout_common::{Signal, internal};
use lookout_metrics::{ClusterMetrics, Metrics, MetricsError};
use parking_lot::RwLock;
use tokio::{net::TcpStream, sync::broadcast, task::JoinHandle};
use tracing::instrument::WithSubscriber;

use crate::{
    BrokerAddress, BrokerStatus, ClusterClient, ClusterConfig, ConnectionError, DialError,
    tls::TlsDialer,
};

/// Cluster client that tracks broker reachability by dialling each broker.
pub struct BrokerClient {
    client_id: String,
    brokers: Vec<BrokerAddress>,
    dial_timeout: Duration,
    refresh_interval: Duration,
    tls: Option<TlsDialer>,
    metadata: RwLock<Arc<[BrokerStatus]>>,
    metrics: OnceLock<Arc<ClusterMetrics>>,
}

impl fmt::Debug for BrokerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrokerClient")
            .field("client_id", &self.client_id)
            .field("brokers", &self.brokers)
            .field("dial_timeout", &self.dial_timeout)
            .field("tls", &self.tls.is_some())
            .finish_non_exhaustive()
    }
}

impl BrokerClient {
    /// Connect to the cluster.
    ///
    /// Every seed broker is dialled concurrently; the client is returned as
    /// soon as the dials finish, provided at least one broker answered.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError::Configuration`] if the options are unusable
    /// and [`ConnectionError::Unreachable`] if no broker could be reached.
    pub async fn connect(config: &ClusterConfig) -> Result<Self, ConnectionError> {
        config.validate()?;

        let brokers = config.broker_addresses()?;
        let client = Self {
            client_id: config.client_id.clone(),
            metadata: RwLock::new(brokers.iter().map(BrokerStatus::unchecked).collect()),
            brokers,
            dial_timeout: config.dial_timeout(),
            refresh_interval: config.metadata_refresh(),
            tls: TlsDialer::from_config(&config.tls)?,
            metrics: OnceLock::new(),
        };

        let reachable = {
            let results = client.dial_all().await;
            client.store_metadata(&results);

            let reachable = results.iter().filter(|(_, r)| r.is_ok()).count();
            if reachable == 0 {
                let last_error = results
                    .into_iter()
                    .filter_map(|(_, r)| r.err())
                    .last()
                    .unwrap_or(DialError::Timeout(client.dial_timeout));

                tracing::error!(
                    brokers = %config.brokers.join(", "),
                    error = %last_error,
                    "No seed broker could be reached"
                );
                return Err(ConnectionError::Unreachable {
                    brokers: config.brokers.join(", "),
                    last_error,
                });
            }

            reachable
        };

        tracing::info!(
            client_id = %client.client_id,
            reachable,
            known = client.brokers.len(),
            "Connected to broker cluster"
        );

        Ok(client)
    }

    /// Re-dial every broker and replace the stored metadata.
    ///
    /// Returns the number of reachable brokers.
    pub async fn refresh(&self) -> usize {
        let results = self.dial_all().await;
        self.store_metadata(&results);

        let reachable = results.iter().filter(|(_, r)| r.is_ok()).count();
        if reachable == 0 {
            tracing::warn!(known = self.brokers.len(), "Metadata refresh reached no broker");
        } else {
            tracing::debug!(reachable, known = self.brokers.len(), "Metadata refreshed");
        }

        reachable
    }

    async fn dial_all(&self) -> Vec<(&BrokerAddress, Result<(), DialError>)> {
        join_all(
            self.brokers
                .iter()
                .map(|broker| async move { (broker, self.dial(broker).await) }),
        )
        .await
    }

    async fn dial(&self, broker: &BrokerAddress) -> Result<(), DialError> {
        let attempt = async {
            let stream = TcpStream::connect((broker.host(), broker.port())).await?;
            if let Some(tls) = &self.tls {
                tls.handshake(broker.host(), stream).await?;
            }
            Ok::<(), DialError>(())
        };

        tokio::time::timeout(self.dial_timeout, attempt)
            .await
            .map_err(|_| DialError::Timeout(self.dial_timeout))?
    }

    fn store_metadata(&self, results: &[(&BrokerAddress, Result<(), DialError>)]) {
        let now = Utc::now();
        let metadata: Arc<[BrokerStatus]> = results
            .iter()
            .map(|(broker, result)| BrokerStatus {
                address: broker.to_string(),
                reachable: result.is_ok(),
                last_checked_at: Some(now),
                last_error: result.as_ref().err().map(ToString::to_string),
            })
            .collect();

        if let Some(metrics) = self.metrics.get() {
            record(metrics, &metadata);
        }

        *self.metadata.write() = metadata;
    }
}

fn record(metrics: &ClusterMetrics, metadata: &[BrokerStatus]) {
    let reachable = metadata.iter().filter(|b| b.reachable).count();
    metrics.record_refresh(metadata.len() as u64, reachable as u64);
}

#[async_trait]
impl ClusterClient for BrokerClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn brokers(&self) -> Arc<[BrokerStatus]> {
        Arc::clone(&self.metadata.read())
    }

    async fn is_reachable(&self) -> bool {
        if self.brokers.is_empty() {
            return false;
        }

        select_ok(
            self.brokers
                .iter()
                .map(|broker| Box::pin(self.dial(broker))),
        )
        .await
        .is_ok()
    }

    fn register_metrics(&self, metrics: &Metrics) -> Result<(), MetricsError> {
        self.metrics
            .set(Arc::new(ClusterMetrics::new(metrics)))
            .map_err(|_| MetricsError::AlreadyRegistered("cluster client"))?;

        if let Some(cluster) = self.metrics.get() {
            record(cluster, &self.brokers());
        }

        Ok(())
    }

    fn start(self: Arc<Self>, mut shutdown: broadcast::Receiver<Signal>) -> JoinHandle<()> {
        tokio::spawn(async move {
            internal!(
                level = DEBUG,
                "Metadata refresher running every {}s",
                self.refresh_interval.as_secs()
            );

            loop {
                tokio::select! {
                    () = tokio::time::sleep(self.refresh_interval) => {}
                    sig = shutdown.recv() => {
                        internal!(level = DEBUG, "Metadata refresher stopping on {sig:?}");
                        break;
                    }
                }

                self.refresh().await;
            }
        }
        .with_current_subscriber())
    }
}
