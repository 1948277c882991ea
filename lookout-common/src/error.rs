//! Error types for the lookout-common crate.

use std::{io, path::PathBuf};

use thiserror::Error;

/// Errors raised while locating, reading, or validating configuration.
///
/// Every variant is fatal: configuration is checked once, before any
/// resource is constructed.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A required configuration field is missing.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// A configuration value is invalid.
    #[error("Invalid configuration for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    /// No configuration file could be found.
    #[error("No configuration file found. Tried:\n{tried}")]
    NotFound { tried: String },

    /// The configuration file could not be read.
    #[error("Failed to read config from {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid RON.
    #[error("Failed to parse config from {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::InvalidValue`].
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
