//! Error types for the cluster client

use std::{io, time::Duration};

use lookout_common::ConfigurationError;
use thiserror::Error;

/// Errors that prevent the cluster client from being created.
///
/// Both variants are fatal at startup.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The cluster options are unusable (bad broker address, unreadable CA file, ...).
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// None of the seed brokers accepted a connection.
    #[error("None of the seed brokers [{brokers}] could be reached: {last_error}")]
    Unreachable {
        brokers: String,
        #[source]
        last_error: DialError,
    },
}

/// Why a single broker dial failed.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("connection timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("invalid TLS server name {0:?}")]
    ServerName(String),
}
