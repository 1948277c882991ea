//! Builds a [`Service`] from configuration

use std::sync::Arc;

use lookout_cluster::{BrokerClient, ClusterClient};
use lookout_common::{internal, logging};
use lookout_metrics::Metrics;
use tracing::instrument::WithSubscriber;

use crate::{Service, ServiceConfig, ServiceError};

/// Construct every resource the service needs, in dependency order.
///
/// The logger comes first so every later failure is logged through it.
/// Nothing is started: no probe runs and no port is bound until
/// [`Service::start`].
///
/// # Errors
///
/// - [`ServiceError::Configuration`] if the configuration is invalid
/// - [`ServiceError::Metrics`] if the metrics exporter cannot be built
/// - [`ServiceError::Connection`] if no seed broker can be reached; there is
///   no retry
pub async fn compose(config: ServiceConfig) -> Result<Service, ServiceError> {
    let logger = logging::dispatch(&config.logging)?;

    let composed = async {
        config.validate().inspect_err(|error| {
            tracing::error!(%error, "Invalid configuration");
        })?;

        let metrics = Metrics::new(&config.metrics, &config.metrics_namespace)
            .inspect_err(|error| tracing::error!(%error, "Failed to build metrics provider"))?;

        // BrokerClient::connect logs its own failure
        let client: Arc<dyn ClusterClient> = Arc::new(BrokerClient::connect(&config.cluster).await?);

        internal!(level = INFO, "Service composed");

        Ok::<_, ServiceError>(Service::from_parts(
            logger.clone(),
            metrics,
            client,
            config.http_server.clone(),
            config.cluster.dial_timeout(),
        ))
    };

    composed.with_subscriber(logger.clone()).await
}
