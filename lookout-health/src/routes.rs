//! Health endpoints

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::HealthHandle;

/// Path of the aggregate health endpoint
pub const HEALTH_PATH: &str = "/admin/health";

/// Path of the liveness endpoint
pub const ALIVE_PATH: &str = "/admin/alive";

/// Routes serving the scheduler's snapshot.
///
/// - `GET /admin/health` returns the snapshot as JSON with 200 when every
///   probe is healthy and 503 otherwise
/// - `GET /admin/alive` returns 200 whenever the process can answer
pub fn router(health: HealthHandle) -> Router {
    Router::new()
        .route(HEALTH_PATH, get(health_handler))
        .route(ALIVE_PATH, get(alive_handler))
        .with_state(health)
}

async fn health_handler(State(health): State<HealthHandle>) -> Response {
    let snapshot = health.snapshot();

    if snapshot.aggregate_healthy {
        (StatusCode::OK, Json(&*snapshot)).into_response()
    } else {
        tracing::debug!(
            unhealthy = ?snapshot
                .per_check
                .iter()
                .filter(|(_, result)| result.status != crate::CheckStatus::Healthy)
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>(),
            "Health endpoint reporting unavailable"
        );
        (StatusCode::SERVICE_UNAVAILABLE, Json(&*snapshot)).into_response()
    }
}

async fn alive_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
