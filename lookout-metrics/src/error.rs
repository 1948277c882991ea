//! Error types for metrics operations

use thiserror::Error;

/// Errors that can occur during metrics operations
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A component tried to register its instruments a second time
    #[error("Metrics for {0} are already registered")]
    AlreadyRegistered(&'static str),

    /// The OTLP exporter could not be built
    #[error("OpenTelemetry exporter error: {0}")]
    Exporter(String),

    /// Flushing or shutting down the meter provider failed
    #[error("OpenTelemetry shutdown error: {0}")]
    Shutdown(String),
}
