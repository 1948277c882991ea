//! Health check error types

use std::{fmt, time::Duration};

use thiserror::Error;

/// Misuse of the scheduler's registration and lifecycle API.
///
/// These are programming errors and are fatal at startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HealthError {
    /// A probe with the same name is already registered
    #[error("A health probe named {0:?} is already registered")]
    DuplicateProbe(String),

    /// A probe would be rescheduled in a tight loop
    #[error("Health probe {0:?} must have a period greater than zero")]
    InvalidPeriod(String),

    /// The operation is not allowed in the scheduler's current state
    #[error("Health scheduler lifecycle violation: {0}")]
    Lifecycle(&'static str),
}

/// Why a single check execution failed.
///
/// Never propagated: the scheduler records it as an unhealthy result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProbeError {
    #[error("{0}")]
    Failed(String),

    #[error("check timed out after {}ms", .0.as_millis())]
    TimedOut(Duration),

    #[error("check panicked: {0}")]
    Panicked(String),
}

impl ProbeError {
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self::Failed(reason.to_string())
    }
}
