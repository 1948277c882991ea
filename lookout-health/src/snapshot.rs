//! Point-in-time view of every probe's latest result

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::CheckOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    /// Registered but not yet executed
    Unknown,
    Healthy,
    Unhealthy,
}

/// Latest result of one probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    pub status: CheckStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// Unhealthy runs since the last healthy one
    pub contiguous_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_first_failure: Option<DateTime<Utc>>,
}

impl CheckResult {
    pub(crate) const fn unknown() -> Self {
        Self {
            status: CheckStatus::Unknown,
            detail: None,
            last_checked_at: None,
            duration_ms: 0,
            contiguous_failures: 0,
            time_of_first_failure: None,
        }
    }

    /// The result after one more run, carrying the failure streak forward
    pub(crate) fn next(
        previous: Option<&Self>,
        outcome: CheckOutcome,
        checked_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> Self {
        let (contiguous_failures, time_of_first_failure) = if outcome.healthy {
            (0, None)
        } else {
            match previous {
                Some(prev) if prev.status == CheckStatus::Unhealthy => (
                    prev.contiguous_failures + 1,
                    prev.time_of_first_failure.or(Some(checked_at)),
                ),
                _ => (1, Some(checked_at)),
            }
        };

        Self {
            status: if outcome.healthy {
                CheckStatus::Healthy
            } else {
                CheckStatus::Unhealthy
            },
            detail: outcome.detail,
            last_checked_at: Some(checked_at),
            duration_ms,
            contiguous_failures,
            time_of_first_failure,
        }
    }
}

/// Aggregate health plus every probe's latest result.
///
/// `aggregate_healthy` is true only when every registered probe's latest
/// result is healthy; a probe that has not run yet counts as not healthy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthSnapshot {
    pub aggregate_healthy: bool,
    pub per_check: BTreeMap<String, CheckResult>,
}

impl HealthSnapshot {
    pub(crate) fn from_checks(per_check: BTreeMap<String, CheckResult>) -> Self {
        let aggregate_healthy = per_check
            .values()
            .all(|result| result.status == CheckStatus::Healthy);

        Self {
            aggregate_healthy,
            per_check,
        }
    }
}

impl Default for HealthSnapshot {
    fn default() -> Self {
        Self::from_checks(BTreeMap::new())
    }
}

/// Shared, read-mostly access to the latest [`HealthSnapshot`].
///
/// Readers get an `Arc` to an immutable snapshot and never observe a
/// partially applied update.
#[derive(Debug, Clone, Default)]
pub struct HealthHandle {
    current: Arc<RwLock<Arc<HealthSnapshot>>>,
}

impl HealthHandle {
    #[must_use]
    pub fn snapshot(&self) -> Arc<HealthSnapshot> {
        Arc::clone(&self.current.read())
    }

    /// Add a probe in the `Unknown` state
    pub(crate) fn seed(&self, name: &str) {
        self.update(|checks| {
            checks.insert(name.to_string(), CheckResult::unknown());
        });
    }

    /// Fold one probe execution into the snapshot
    pub(crate) fn record(
        &self,
        name: &str,
        outcome: CheckOutcome,
        checked_at: DateTime<Utc>,
        duration_ms: u64,
    ) -> CheckResult {
        let mut recorded = CheckResult::unknown();
        self.update(|checks| {
            let next = CheckResult::next(checks.get(name), outcome, checked_at, duration_ms);
            recorded = next.clone();
            checks.insert(name.to_string(), next);
        });
        recorded
    }

    fn update(&self, apply: impl FnOnce(&mut BTreeMap<String, CheckResult>)) {
        let mut current = self.current.write();
        let mut checks = current.per_check.clone();
        apply(&mut checks);
        *current = Arc::new(HealthSnapshot::from_checks(checks));
    }
}
