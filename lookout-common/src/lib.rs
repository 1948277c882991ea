//! Shared building blocks for the Lookout workspace: the shutdown [`Signal`],
//! configuration loading, and logging setup.

pub mod config;
pub mod error;
pub mod logging;

pub use error::ConfigurationError;
pub use tracing;

/// Lifecycle signal broadcast to every long-running task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Shutdown,
}
