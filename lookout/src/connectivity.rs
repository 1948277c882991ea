//! Health probe for the broker cluster

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use lookout_cluster::ClusterClient;
use lookout_health::{Check, CheckOutcome, HealthProbe, ProbeError};

/// Name the probe is registered under
pub const CLUSTER_PROBE: &str = "cluster";

const INITIAL_DELAY: Duration = Duration::from_secs(3);
const PERIOD: Duration = Duration::from_secs(25);

/// Reports whether the client can still reach at least one broker.
///
/// The check only dials; it never changes what the client knows about the
/// cluster. A dial that outlives `timeout` is reported as unhealthy.
pub struct ClusterConnectivityProbe {
    client: Arc<dyn ClusterClient>,
    timeout: Duration,
}

impl ClusterConnectivityProbe {
    pub fn new(client: Arc<dyn ClusterClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Schedule the check: first run after 3s, then 25s after each run
    pub fn into_probe(self) -> HealthProbe {
        HealthProbe::new(CLUSTER_PROBE, self)
            .with_initial_delay(INITIAL_DELAY)
            .with_period(PERIOD)
    }
}

#[async_trait]
impl Check for ClusterConnectivityProbe {
    async fn check(&self) -> Result<CheckOutcome, ProbeError> {
        match tokio::time::timeout(self.timeout, self.client.is_reachable()).await {
            Ok(true) => Ok(CheckOutcome::healthy()),
            Ok(false) => Ok(CheckOutcome::unhealthy(format!(
                "none of the brokers used by {} is reachable",
                self.client.client_id()
            ))),
            Err(_) => Ok(CheckOutcome::unhealthy(format!(
                "cluster connectivity check timed out after {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}
