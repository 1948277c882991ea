//! Errors surfaced by composing or starting the service

use lookout_cluster::ConnectionError;
use lookout_common::ConfigurationError;
use lookout_health::HealthError;
use lookout_metrics::MetricsError;
use lookout_server::ServerError;
use thiserror::Error;

/// Every error [`compose`](crate::compose) and
/// [`Service::start`](crate::Service::start) can return.
///
/// All of them are fatal; the binary decides how to exit.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Health(#[from] HealthError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Server(#[from] ServerError),
}
