//! Metrics configuration

use serde::Deserialize;

/// Configuration for metrics export
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MetricsConfig {
    /// Push metrics to an OpenTelemetry Collector
    ///
    /// When disabled, instruments are still created and recorded locally but
    /// nothing leaves the process.
    #[serde(default)]
    pub enabled: bool,

    /// OTLP endpoint URL for metrics export
    ///
    /// Common values:
    /// - `http://localhost:4318/v1/metrics` (OTLP HTTP default for local development)
    /// - `http://otel-collector:4318/v1/metrics` (Docker Compose service name)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// How often collected metrics are pushed, in seconds
    #[serde(default = "default_export_interval")]
    pub export_interval_secs: u64,
}

fn default_endpoint() -> String {
    "http://localhost:4318/v1/metrics".to_string()
}

const fn default_export_interval() -> u64 {
    60
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: default_endpoint(),
            export_interval_secs: default_export_interval(),
        }
    }
}
