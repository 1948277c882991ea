//! Health probe metrics
//!
//! Tracks every scheduled probe execution:
//! - Runs by probe and outcome
//! - Check durations
//! - The latest healthy/unhealthy state per probe

use std::time::Duration;

use dashmap::DashMap;
use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge, Histogram},
};

use crate::Metrics;

#[derive(Debug, Default, Clone, Copy)]
struct ProbeTally {
    runs: u64,
    failures: u64,
}

/// Probe metrics collector
#[derive(Debug)]
pub struct ProbeMetrics {
    /// Total number of probe executions by probe and outcome
    runs_total: Counter<u64>,

    /// Distribution of probe check durations in seconds
    duration_seconds: Histogram<f64>,

    /// 1 if the probe's latest result is healthy, 0 otherwise
    healthy: Gauge<u64>,

    tallies: DashMap<String, ProbeTally>,
}

impl ProbeMetrics {
    /// Create the probe instruments
    #[must_use]
    pub fn new(metrics: &Metrics) -> Self {
        let meter = metrics.meter();

        let runs_total = meter
            .u64_counter(metrics.instrument_name("health.probe.runs.total"))
            .with_description("Total number of health probe executions by outcome")
            .build();

        let duration_seconds = meter
            .f64_histogram(metrics.instrument_name("health.probe.duration.seconds"))
            .with_description("Distribution of health probe check durations")
            .build();

        let healthy = meter
            .u64_gauge(metrics.instrument_name("health.probe.healthy"))
            .with_description("Latest result of each health probe (1 = healthy)")
            .build();

        Self {
            runs_total,
            duration_seconds,
            healthy,
            tallies: DashMap::new(),
        }
    }

    /// Record one completed probe execution
    pub fn record_run(&self, probe: &str, healthy: bool, duration: Duration) {
        let outcome = if healthy { "healthy" } else { "unhealthy" };
        let probe_attr = KeyValue::new("probe", probe.to_string());

        self.runs_total.add(
            1,
            &[probe_attr.clone(), KeyValue::new("outcome", outcome)],
        );
        self.duration_seconds
            .record(duration.as_secs_f64(), std::slice::from_ref(&probe_attr));
        self.healthy.record(u64::from(healthy), &[probe_attr]);

        let mut tally = self.tallies.entry(probe.to_string()).or_default();
        tally.runs += 1;
        if !healthy {
            tally.failures += 1;
        }
    }

    /// Number of recorded executions of `probe`
    #[must_use]
    pub fn runs(&self, probe: &str) -> u64 {
        self.tallies.get(probe).map_or(0, |t| t.runs)
    }

    /// Number of recorded unhealthy executions of `probe`
    #[must_use]
    pub fn failures(&self, probe: &str) -> u64 {
        self.tallies.get(probe).map_or(0, |t| t.failures)
    }
}
