//! Broker cluster metrics
//!
//! Tracks the cluster client's view of the brokers:
//! - Known and reachable broker counts
//! - Metadata refreshes by outcome

use std::sync::atomic::{AtomicU64, Ordering};

use opentelemetry::{
    KeyValue,
    metrics::{Counter, Gauge},
};

use crate::Metrics;

/// Cluster metrics collector
#[derive(Debug)]
pub struct ClusterMetrics {
    /// Number of brokers the client knows about
    brokers_known: Gauge<u64>,

    /// Number of brokers that answered the last dial
    brokers_reachable: Gauge<u64>,

    /// Total number of metadata refreshes by outcome
    refreshes_total: Counter<u64>,

    // Local mirrors of the exported values
    known: AtomicU64,
    reachable: AtomicU64,
    refreshes: AtomicU64,
    failed_refreshes: AtomicU64,
}

impl ClusterMetrics {
    /// Create the cluster instruments
    #[must_use]
    pub fn new(metrics: &Metrics) -> Self {
        let meter = metrics.meter();

        let brokers_known = meter
            .u64_gauge(metrics.instrument_name("cluster.brokers.known"))
            .with_description("Number of brokers known to the cluster client")
            .build();

        let brokers_reachable = meter
            .u64_gauge(metrics.instrument_name("cluster.brokers.reachable"))
            .with_description("Number of brokers reachable at the last refresh")
            .build();

        let refreshes_total = meter
            .u64_counter(metrics.instrument_name("cluster.metadata.refreshes.total"))
            .with_description("Total number of metadata refreshes by outcome")
            .build();

        Self {
            brokers_known,
            brokers_reachable,
            refreshes_total,
            known: AtomicU64::new(0),
            reachable: AtomicU64::new(0),
            refreshes: AtomicU64::new(0),
            failed_refreshes: AtomicU64::new(0),
        }
    }

    /// Record the outcome of a metadata refresh
    ///
    /// A refresh that reached no broker counts as failed.
    pub fn record_refresh(&self, known: u64, reachable: u64) {
        let outcome = if reachable > 0 { "ok" } else { "failed" };

        self.brokers_known.record(known, &[]);
        self.brokers_reachable.record(reachable, &[]);
        self.refreshes_total
            .add(1, &[KeyValue::new("outcome", outcome)]);

        self.known.store(known, Ordering::Relaxed);
        self.reachable.store(reachable, Ordering::Relaxed);
        self.refreshes.fetch_add(1, Ordering::Relaxed);
        if reachable == 0 {
            self.failed_refreshes.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn known_brokers(&self) -> u64 {
        self.known.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn reachable_brokers(&self) -> u64 {
        self.reachable.load(Ordering::Relaxed)
    }

    /// Total refreshes recorded so far
    #[must_use]
    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::Relaxed)
    }

    /// Refreshes that reached no broker
    #[must_use]
    pub fn failed_refreshes(&self) -> u64 {
        self.failed_refreshes.load(Ordering::Relaxed)
    }
}
