//! The composed service and its startup sequence

use std::{fmt, sync::Arc, time::Duration};

use lookout_cluster::ClusterClient;
use lookout_common::{Signal, internal};
use lookout_health::{HealthHandle, HealthScheduler};
use lookout_metrics::{Metrics, ProbeMetrics};
use lookout_server::{HttpServerConfig, RestServer};
use tokio::sync::broadcast;
use tracing::{Dispatch, instrument::WithSubscriber};

use crate::{
    ServiceError, connectivity::ClusterConnectivityProbe, overview::ClusterOverview, routes,
};

/// Everything [`compose`](crate::compose) built, ready to start.
pub struct Service {
    logger: Dispatch,
    metrics: Metrics,
    client: Arc<dyn ClusterClient>,
    overview: Arc<ClusterOverview>,
    http_server: HttpServerConfig,
    probe_timeout: Duration,
    scheduler: HealthScheduler,
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("client_id", &self.client.client_id())
            .field("metrics", &self.metrics)
            .field("http_server", &self.http_server)
            .field("probe_timeout", &self.probe_timeout)
            .field("probes", &self.scheduler.probe_names())
            .finish_non_exhaustive()
    }
}

impl Service {
    /// Assemble a service from already constructed parts.
    ///
    /// `probe_timeout` bounds each cluster connectivity check. The health
    /// scheduler is created here, empty, so its results can be read before
    /// the service starts.
    pub fn from_parts(
        logger: Dispatch,
        metrics: Metrics,
        client: Arc<dyn ClusterClient>,
        http_server: HttpServerConfig,
        probe_timeout: Duration,
    ) -> Self {
        let scheduler = HealthScheduler::new().with_metrics(Arc::new(ProbeMetrics::new(&metrics)));

        Self {
            logger,
            metrics,
            scheduler,
            overview: Arc::new(ClusterOverview::new(Arc::clone(&client))),
            client,
            http_server,
            probe_timeout,
        }
    }

    /// The logger every service task writes to
    pub const fn logger(&self) -> &Dispatch {
        &self.logger
    }

    pub fn client(&self) -> &Arc<dyn ClusterClient> {
        &self.client
    }

    pub fn overview(&self) -> &Arc<ClusterOverview> {
        &self.overview
    }

    /// Read access to the health results served at `/admin/health`
    pub fn health(&self) -> HealthHandle {
        self.scheduler.handle()
    }

    /// Start background work and serve HTTP until `shutdown` fires.
    ///
    /// In order: register cluster metrics, start the client's metadata
    /// refresher, register and run the cluster connectivity probe, then bind
    /// and serve the route table. Returns once the listener has drained.
    ///
    /// # Errors
    ///
    /// Any failure in those steps is logged and returned, after the probes
    /// and the metadata refresher have stopped.
    pub async fn start(self, shutdown: broadcast::Receiver<Signal>) -> Result<(), ServiceError> {
        let logger = self.logger.clone();
        self.run(shutdown).with_subscriber(logger).await
    }

    async fn run(self, mut shutdown: broadcast::Receiver<Signal>) -> Result<(), ServiceError> {
        self.client
            .register_metrics(&self.metrics)
            .inspect_err(|error| tracing::error!(%error, "Failed to register cluster metrics"))?;

        // Every background task stops on this channel, which fires on the
        // caller's shutdown signal or when startup or serving fails
        let (stop, _) = broadcast::channel(4);
        let refresher_stop = stop.subscribe();
        let probes_stop = stop.subscribe();
        let server_stop = stop.subscribe();

        let relay = tokio::spawn({
            let stop = stop.clone();
            async move {
                let signal = shutdown.recv().await.unwrap_or(Signal::Shutdown);
                let _ = stop.send(signal);
            }
            .with_current_subscriber()
        });

        let refresher = Arc::clone(&self.client).start(refresher_stop);

        let served = self.serve(probes_stop, server_stop).await;

        let _ = stop.send(Signal::Shutdown);
        relay.abort();
        self.scheduler.stopped().await;
        if let Err(error) = refresher.await {
            tracing::error!(%error, "Metadata refresher ended abnormally");
        }
        if let Err(error) = self.metrics.shutdown() {
            tracing::warn!(%error, "Failed to flush metrics");
        }

        served?;

        internal!(level = INFO, "Service stopped");
        Ok(())
    }

    /// Register and run the connectivity probe, then bind and serve until
    /// `server_stop` fires
    async fn serve(
        &self,
        probes_stop: broadcast::Receiver<Signal>,
        server_stop: broadcast::Receiver<Signal>,
    ) -> Result<(), ServiceError> {
        self.scheduler
            .register(
                ClusterConnectivityProbe::new(Arc::clone(&self.client), self.probe_timeout)
                    .into_probe(),
            )
            .inspect_err(|error| tracing::error!(%error, "Failed to register health probe"))?;
        self.scheduler
            .run(probes_stop)
            .inspect_err(|error| tracing::error!(%error, "Failed to start health scheduler"))?;

        let router = routes::route_table(self.scheduler.handle(), Arc::clone(&self.overview));
        let server = RestServer::bind(&self.http_server, router)
            .await
            .inspect_err(|error| tracing::error!(%error, "Failed to start HTTP server"))?;

        internal!(level = INFO, "Service started on {}", server.local_addr());
        server
            .serve(server_stop)
            .await
            .inspect_err(|error| tracing::error!(%error, "HTTP server failed"))?;

        Ok(())
    }
}
