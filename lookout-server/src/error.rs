//! HTTP server error types

use lookout_common::ConfigurationError;
use thiserror::Error;

/// Errors that stop the HTTP listener
#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Failed to bind to the specified address
    #[error("Failed to bind HTTP server to {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },

    /// Certificate or key could not be loaded
    #[error("Failed to load TLS material from {path}: {reason}")]
    Tls { path: String, reason: String },

    /// The serve loop failed
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),

    /// The serve task panicked
    #[error("HTTP server task failed: {0}")]
    Task(String),
}
