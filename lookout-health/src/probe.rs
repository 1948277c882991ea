//! Health probes: a named check plus its schedule

use std::{any::Any, fmt, future::Future, panic::AssertUnwindSafe, sync::Arc, time::Duration};

use async_trait::async_trait;
use futures_util::FutureExt;

use crate::ProbeError;

const DEFAULT_PERIOD: Duration = Duration::from_secs(10);

/// Structured result of one check execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub healthy: bool,
    pub detail: Option<String>,
}

impl CheckOutcome {
    #[must_use]
    pub const fn healthy() -> Self {
        Self {
            healthy: true,
            detail: None,
        }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            healthy: false,
            detail: Some(detail.into()),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Something that can report whether a dependency is healthy.
///
/// Implemented for any `Fn() -> impl Future<Output = Result<CheckOutcome, ProbeError>>`,
/// so closures can be registered directly.
#[async_trait]
pub trait Check: Send + Sync {
    async fn check(&self) -> Result<CheckOutcome, ProbeError>;
}

#[async_trait]
impl<F, Fut> Check for F
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<CheckOutcome, ProbeError>> + Send,
{
    async fn check(&self) -> Result<CheckOutcome, ProbeError> {
        (self)().await
    }
}

/// A named check with its schedule.
///
/// The name identifies the probe within a scheduler. `initial_delay` is
/// waited once before the first run; `period` is waited after each run
/// completes.
#[derive(Clone)]
pub struct HealthProbe {
    name: String,
    check: Arc<dyn Check>,
    initial_delay: Duration,
    period: Duration,
    timeout: Option<Duration>,
}

impl fmt::Debug for HealthProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HealthProbe")
            .field("name", &self.name)
            .field("initial_delay", &self.initial_delay)
            .field("period", &self.period)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl HealthProbe {
    /// Create a probe that runs immediately and then every 10 seconds
    pub fn new(name: impl Into<String>, check: impl Check + 'static) -> Self {
        Self {
            name: name.into(),
            check: Arc::new(check),
            initial_delay: Duration::ZERO,
            period: DEFAULT_PERIOD,
            timeout: None,
        }
    }

    #[must_use]
    pub const fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub const fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Bound every execution; an execution that overruns is unhealthy
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Run the check once.
    ///
    /// Errors, panics and timeouts all become unhealthy outcomes with a
    /// non-empty detail.
    pub(crate) async fn execute(&self) -> CheckOutcome {
        let run = AssertUnwindSafe(self.check.check()).catch_unwind();

        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .unwrap_or(Ok(Err(ProbeError::TimedOut(limit)))),
            None => run.await,
        };

        let error = match result {
            Ok(Ok(outcome)) => return outcome,
            Ok(Err(error)) => error,
            Err(panic) => ProbeError::Panicked(panic_message(panic.as_ref())),
        };

        let detail = error.to_string();
        if detail.is_empty() {
            CheckOutcome::unhealthy("check failed")
        } else {
            CheckOutcome::unhealthy(detail)
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(ToString::to_string)
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
