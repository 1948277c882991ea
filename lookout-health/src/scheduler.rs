//! Runs registered probes on their own schedules and keeps the snapshot current

use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;
use futures_util::future::join_all;
use lookout_common::{Signal, internal};
use lookout_metrics::ProbeMetrics;
use parking_lot::Mutex;
use tokio::{
    sync::broadcast,
    task::JoinHandle,
    time::{Duration, Instant},
};
use tracing::instrument::WithSubscriber;

use crate::{HealthError, HealthHandle, HealthProbe, HealthSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Registering,
    Running,
    Stopped,
}

/// Owns a set of probes and, once running, one task per probe.
///
/// Probes must be registered before [`HealthScheduler::run`]. Each probe
/// waits its initial delay, runs, then waits its period after every run
/// completes, so executions of one probe never overlap. A failing or
/// panicking probe only affects its own result.
#[derive(Debug)]
pub struct HealthScheduler {
    probes: Mutex<Vec<HealthProbe>>,
    phase: Mutex<Phase>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    handle: HealthHandle,
    metrics: Option<Arc<ProbeMetrics>>,
}

impl Default for HealthScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self {
            probes: Mutex::new(Vec::new()),
            phase: Mutex::new(Phase::Registering),
            tasks: Mutex::new(Vec::new()),
            handle: HealthHandle::default(),
            metrics: None,
        }
    }

    /// Record every probe execution in `metrics`
    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<ProbeMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Add a probe. Until it first runs its status is `Unknown`.
    ///
    /// # Errors
    ///
    /// - [`HealthError::DuplicateProbe`] if the name is taken; the existing
    ///   probe is kept
    /// - [`HealthError::InvalidPeriod`] if the period is zero
    /// - [`HealthError::Lifecycle`] if the scheduler is already running
    pub fn register(&self, probe: HealthProbe) -> Result<(), HealthError> {
        let phase = self.phase.lock();
        if *phase != Phase::Registering {
            return Err(HealthError::Lifecycle(
                "probes cannot be registered after the scheduler has started",
            ));
        }

        if probe.period().is_zero() {
            return Err(HealthError::InvalidPeriod(probe.name().to_string()));
        }

        let mut probes = self.probes.lock();
        if probes.iter().any(|existing| existing.name() == probe.name()) {
            return Err(HealthError::DuplicateProbe(probe.name().to_string()));
        }

        self.handle.seed(probe.name());
        tracing::debug!(
            probe = probe.name(),
            initial_delay = ?probe.initial_delay(),
            period = ?probe.period(),
            "Health probe registered"
        );
        probes.push(probe);
        drop(phase);

        Ok(())
    }

    /// Start one task per registered probe and return immediately.
    ///
    /// Tasks stop at the first signal on `shutdown`. An execution in flight
    /// is allowed to finish and its result is still recorded.
    ///
    /// # Errors
    ///
    /// Returns [`HealthError::Lifecycle`] if the scheduler was already started.
    pub fn run(&self, shutdown: broadcast::Receiver<Signal>) -> Result<(), HealthError> {
        {
            let mut phase = self.phase.lock();
            if *phase != Phase::Registering {
                return Err(HealthError::Lifecycle("the scheduler can only be started once"));
            }
            *phase = Phase::Running;
        }

        let probes = self.probes.lock().clone();
        tracing::info!(probes = probes.len(), "Health scheduler starting");

        let tasks = probes
            .into_iter()
            .map(|probe| {
                tokio::spawn(
                    run_probe(
                        probe,
                        self.handle.clone(),
                        self.metrics.clone(),
                        shutdown.resubscribe(),
                    )
                    .with_current_subscriber(),
                )
            })
            .collect();

        *self.tasks.lock() = tasks;
        Ok(())
    }

    /// Wait for every probe task to finish after shutdown
    pub async fn stopped(&self) {
        let tasks = std::mem::take(&mut *self.tasks.lock());

        for result in join_all(tasks).await {
            if let Err(error) = result {
                tracing::error!(%error, "Health probe task ended abnormally");
            }
        }

        *self.phase.lock() = Phase::Stopped;
        internal!(level = DEBUG, "Health scheduler stopped");
    }

    /// Current results; cheap to call from request handlers
    #[must_use]
    pub fn snapshot(&self) -> Arc<HealthSnapshot> {
        self.handle.snapshot()
    }

    /// A read handle that outlives borrows of the scheduler
    #[must_use]
    pub fn handle(&self) -> HealthHandle {
        self.handle.clone()
    }

    #[must_use]
    pub fn probe_names(&self) -> BTreeSet<String> {
        self.probes
            .lock()
            .iter()
            .map(|probe| probe.name().to_string())
            .collect()
    }
}

/// Sleep for `duration` unless shutdown arrives first
async fn wait(duration: Duration, shutdown: &mut broadcast::Receiver<Signal>) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.recv() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

async fn run_probe(
    probe: HealthProbe,
    handle: HealthHandle,
    metrics: Option<Arc<ProbeMetrics>>,
    mut shutdown: broadcast::Receiver<Signal>,
) {
    if !wait(probe.initial_delay(), &mut shutdown).await {
        return;
    }

    loop {
        let checked_at = Utc::now();
        let started = Instant::now();

        let outcome = probe.execute().await;

        let elapsed = started.elapsed();
        let healthy = outcome.healthy;
        let duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let result = handle.record(probe.name(), outcome, checked_at, duration_ms);

        if let Some(metrics) = &metrics {
            metrics.record_run(probe.name(), healthy, elapsed);
        }

        if healthy {
            tracing::debug!(probe = probe.name(), duration_ms, "Health probe passed");
        } else {
            tracing::warn!(
                probe = probe.name(),
                detail = result.detail.as_deref().unwrap_or_default(),
                contiguous_failures = result.contiguous_failures,
                "Health probe failed"
            );
        }

        if !wait(probe.period(), &mut shutdown).await {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{CheckOutcome, CheckStatus, ProbeError};

    fn healthy_probe(name: &str) -> HealthProbe {
        HealthProbe::new(name, || async { Ok(CheckOutcome::healthy()) })
    }

    fn counting_probe(name: &str, runs: &Arc<AtomicUsize>) -> HealthProbe {
        let runs = Arc::clone(runs);
        HealthProbe::new(name, move || {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(CheckOutcome::healthy())
            }
        })
    }

    #[test]
    fn test_duplicate_registration_keeps_first_probe() {
        let scheduler = HealthScheduler::new();
        scheduler
            .register(healthy_probe("cluster").with_period(Duration::from_secs(5)))
            .expect("first registration");

        let err = scheduler
            .register(healthy_probe("cluster").with_period(Duration::from_secs(99)))
            .expect_err("duplicate name");

        assert_eq!(err, HealthError::DuplicateProbe("cluster".to_string()));
        assert_eq!(scheduler.probe_names().len(), 1);
        assert_eq!(
            scheduler.probes.lock()[0].period(),
            Duration::from_secs(5)
        );
    }

    #[test]
    fn test_zero_period_is_rejected() {
        let scheduler = HealthScheduler::new();
        let err = scheduler
            .register(healthy_probe("busy").with_period(Duration::ZERO))
            .expect_err("zero period");

        assert_eq!(err, HealthError::InvalidPeriod("busy".to_string()));
        assert!(scheduler.probe_names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_after_run_is_rejected() {
        let scheduler = HealthScheduler::new();
        let (shutdown, receiver) = broadcast::channel(1);
        scheduler.run(receiver).expect("first run");

        assert!(matches!(
            scheduler.register(healthy_probe("late")),
            Err(HealthError::Lifecycle(_))
        ));
        assert!(matches!(
            scheduler.run(shutdown.subscribe()),
            Err(HealthError::Lifecycle(_))
        ));

        shutdown.send(Signal::Shutdown).expect("receiver alive");
        scheduler.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_until_first_run_then_healthy() {
        let scheduler = HealthScheduler::new();
        scheduler
            .register(healthy_probe("cluster").with_initial_delay(Duration::from_secs(3)))
            .expect("registered");

        let (shutdown, receiver) = broadcast::channel(1);
        scheduler.run(receiver).expect("run");

        let before = scheduler.snapshot();
        assert_eq!(before.per_check["cluster"].status, CheckStatus::Unknown);
        assert!(!before.aggregate_healthy);

        tokio::time::sleep(Duration::from_secs(4)).await;

        let after = scheduler.snapshot();
        assert_eq!(after.per_check["cluster"].status, CheckStatus::Healthy);
        assert!(after.per_check["cluster"].last_checked_at.is_some());
        assert!(after.aggregate_healthy);

        shutdown.send(Signal::Shutdown).expect("receiver alive");
        scheduler.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_probe_is_unknown_only_until_it_runs() {
        let scheduler = HealthScheduler::new();
        scheduler.register(healthy_probe("cluster")).expect("registered");

        let (shutdown, receiver) = broadcast::channel(1);
        scheduler.run(receiver).expect("run");
        assert_eq!(
            scheduler.snapshot().per_check["cluster"].status,
            CheckStatus::Unknown
        );

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(
            scheduler.snapshot().per_check["cluster"].status,
            CheckStatus::Healthy
        );

        shutdown.send(Signal::Shutdown).expect("receiver alive");
        scheduler.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_probe_does_not_stop_others() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = HealthScheduler::new();
        scheduler
            .register(
                HealthProbe::new("broken", || async {
                    Err(ProbeError::failed("broker refused connection"))
                })
                .with_period(Duration::from_secs(1)),
            )
            .expect("registered");
        scheduler
            .register(counting_probe("steady", &runs).with_period(Duration::from_secs(1)))
            .expect("registered");

        let (shutdown, receiver) = broadcast::channel(1);
        scheduler.run(receiver).expect("run");
        tokio::time::sleep(Duration::from_millis(5_500)).await;

        let snapshot = scheduler.snapshot();
        let broken = &snapshot.per_check["broken"];
        assert_eq!(broken.status, CheckStatus::Unhealthy);
        assert_eq!(broken.detail.as_deref(), Some("broker refused connection"));
        assert!(broken.contiguous_failures >= 5);
        assert!(broken.time_of_first_failure.is_some());
        assert_eq!(snapshot.per_check["steady"].status, CheckStatus::Healthy);
        assert!(!snapshot.aggregate_healthy);
        assert!(runs.load(Ordering::SeqCst) >= 5);

        shutdown.send(Signal::Shutdown).expect("receiver alive");
        scheduler.stopped().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_are_spaced_by_period_after_completion() {
        let starts = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&starts);
        let probe = HealthProbe::new("slow", move || {
            let recorded = Arc::clone(&recorded);
            async move {
                recorded.lock().push(Instant::now());
                tokio::time::sleep(Duration::from_secs(2)).await;
                Ok(CheckOutcome::healthy())
            }
        })
        .with_period(Duration::from_secs(5));

        let scheduler = HealthScheduler::new();
        scheduler.register(probe).expect("registered");
        let (shutdown, receiver) = broadcast::channel(1);
        scheduler.run(receiver).expect("run");

        tokio::time::sleep(Duration::from_secs(30)).await;
        shutdown.send(Signal::Shutdown).expect("receiver alive");
        scheduler.stopped().await;

        let starts = starts.lock();
        assert!(starts.len() >= 3);
        for pair in starts.windows(2) {
            // 2s of check plus 5s of period
            assert!(pair[1] - pair[0] >= Duration::from_secs(7));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_probe_tasks() {
        let runs = Arc::new(AtomicUsize::new(0));
        let scheduler = HealthScheduler::new();
        scheduler
            .register(counting_probe("cluster", &runs).with_period(Duration::from_secs(1)))
            .expect("registered");

        let (shutdown, receiver) = broadcast::channel(1);
        scheduler.run(receiver).expect("run");
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        shutdown.send(Signal::Shutdown).expect("receiver alive");
        scheduler.stopped().await;
        let after_stop = runs.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_without_probes_is_healthy() {
        let scheduler = HealthScheduler::new();
        let (shutdown, receiver) = broadcast::channel(1);
        scheduler.run(receiver).expect("run");

        assert!(scheduler.snapshot().aggregate_healthy);

        shutdown.send(Signal::Shutdown).expect("receiver alive");
        scheduler.stopped().await;
    }
}
