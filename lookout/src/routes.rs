//! The service's route table

use std::sync::Arc;

use axum::Router;
use lookout_health::HealthHandle;

use crate::overview::{self, ClusterOverview};

/// Every route the HTTP listener serves:
///
/// | route | handler |
/// |---|---|
/// | `GET /admin/health` | aggregate and per-probe health, 200 or 503 |
/// | `GET /admin/alive` | 200 while the listener runs |
/// | `GET /api/brokers` | last known broker metadata |
pub fn route_table(health: HealthHandle, overview: Arc<ClusterOverview>) -> Router {
    lookout_health::router(health).merge(overview::router(overview))
}
