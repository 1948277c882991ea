//! OpenTelemetry metrics for Lookout
//!
//! A [`Metrics`] value owns the service's meter provider. It is built once by
//! the composer and handed to every component that records instruments; there
//! is no global metrics instance.
//!
//! # Architecture
//!
//! ```text
//! Lookout → OTLP/HTTP → OpenTelemetry Collector → Prometheus (scrape) → Grafana
//! ```
//!
//! All instrument names are prefixed with the configured metrics namespace,
//! e.g. `lookout.cluster.brokers.reachable`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use lookout_metrics::{ClusterMetrics, Metrics, MetricsConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let metrics = Metrics::new(&MetricsConfig::default(), "lookout")?;
//! let cluster = ClusterMetrics::new(&metrics);
//! cluster.record_refresh(3, 2);
//! # Ok(())
//! # }
//! ```

mod cluster;
mod config;
mod error;
mod exporter;
mod health;

use std::{fmt, sync::Arc, time::Duration};

use opentelemetry::{
    InstrumentationScope,
    metrics::{Meter, MeterProvider},
};
use opentelemetry_sdk::metrics::SdkMeterProvider;

pub use cluster::ClusterMetrics;
pub use config::MetricsConfig;
pub use error::MetricsError;
pub use health::ProbeMetrics;

/// The service's meter provider, scoped to one metrics namespace
#[derive(Clone)]
pub struct Metrics {
    provider: SdkMeterProvider,
    namespace: Arc<str>,
    exporting: bool,
}

impl fmt::Debug for Metrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metrics")
            .field("namespace", &self.namespace)
            .field("exporting", &self.exporting)
            .finish_non_exhaustive()
    }
}

impl Metrics {
    /// Build the meter provider
    ///
    /// When export is disabled the provider has no reader: instruments work
    /// as usual but nothing is pushed anywhere.
    ///
    /// # Errors
    ///
    /// Returns an error if the OTLP exporter cannot be initialized.
    pub fn new(config: &MetricsConfig, namespace: &str) -> Result<Self, MetricsError> {
        let provider = if config.enabled {
            tracing::info!(
                endpoint = %config.endpoint,
                namespace,
                "Initializing OpenTelemetry metrics with OTLP exporter"
            );
            exporter::otlp_provider(
                &config.endpoint,
                Duration::from_secs(config.export_interval_secs),
            )?
        } else {
            tracing::info!(namespace, "Metrics export is disabled");
            SdkMeterProvider::builder().build()
        };

        Ok(Self {
            provider,
            namespace: Arc::from(namespace),
            exporting: config.enabled,
        })
    }

    /// The metrics namespace every instrument name starts with
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Whether metrics are pushed to an OTLP endpoint
    #[must_use]
    pub const fn is_exporting(&self) -> bool {
        self.exporting
    }

    pub(crate) fn meter(&self) -> Meter {
        self.provider
            .meter_with_scope(InstrumentationScope::builder(self.namespace.to_string()).build())
    }

    pub(crate) fn instrument_name(&self, suffix: &str) -> String {
        format!("{}.{suffix}", self.namespace)
    }

    /// Flush pending metrics and stop the exporter
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to flush.
    pub fn shutdown(&self) -> Result<(), MetricsError> {
        if !self.exporting {
            return Ok(());
        }

        self.provider
            .shutdown()
            .map_err(|e| MetricsError::Shutdown(e.to_string()))
    }
}
