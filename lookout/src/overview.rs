//! Cluster overview: what the client last learned about each broker

use std::sync::Arc;

use axum::{Json, Router, extract::State, routing::get};
use lookout_cluster::{BrokerStatus, ClusterClient};
use serde::Serialize;

/// Path of the broker overview endpoint
pub const BROKERS_PATH: &str = "/api/brokers";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerOverview {
    pub client_id: String,
    pub known: usize,
    pub reachable: usize,
    pub brokers: Vec<BrokerStatus>,
}

/// Serves the cluster client's broker metadata.
///
/// Answers from the metadata the client keeps refreshed in the background;
/// a request never waits on a broker.
pub struct ClusterOverview {
    client: Arc<dyn ClusterClient>,
}

impl ClusterOverview {
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self { client }
    }

    pub fn overview(&self) -> BrokerOverview {
        let brokers = self.client.brokers().to_vec();

        BrokerOverview {
            client_id: self.client.client_id().to_string(),
            known: brokers.len(),
            reachable: brokers.iter().filter(|b| b.reachable).count(),
            brokers,
        }
    }
}

pub fn router(overview: Arc<ClusterOverview>) -> Router {
    Router::new()
        .route(BROKERS_PATH, get(brokers_handler))
        .with_state(overview)
}

async fn brokers_handler(State(overview): State<Arc<ClusterOverview>>) -> Json<BrokerOverview> {
    Json(overview.overview())
}
