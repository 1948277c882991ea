//! Configuration file discovery and loading.
//!
//! Configuration is written in RON and deserialized straight into the
//! caller's type. Discovery uses the following precedence:
//!
//! 1. A path given explicitly (e.g. on the command line)
//! 2. The locator's environment variable
//! 3. Each default path, in order

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;

use crate::ConfigurationError;

/// Finds the configuration file for a binary.
#[derive(Debug, Clone)]
pub struct ConfigLocator {
    env_var: &'static str,
    defaults: Vec<PathBuf>,
}

impl ConfigLocator {
    #[must_use]
    pub fn new(env_var: &'static str, defaults: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            env_var,
            defaults: defaults.into_iter().collect(),
        }
    }

    /// Resolve the configuration path.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit or environment-provided path does not
    /// exist, or if none of the default paths exist.
    pub fn locate(&self, explicit: Option<&Path>) -> Result<PathBuf, ConfigurationError> {
        if let Some(path) = explicit {
            return existing(path.to_path_buf(), "--config");
        }

        if let Ok(env_path) = std::env::var(self.env_var) {
            return existing(PathBuf::from(env_path), self.env_var);
        }

        if let Some(path) = self.defaults.iter().find(|p| p.exists()) {
            return Ok(path.clone());
        }

        let tried = std::iter::once(format!("  - {} environment variable", self.env_var))
            .chain(self.defaults.iter().map(|p| format!("  - {}", p.display())))
            .collect::<Vec<_>>()
            .join("\n");

        Err(ConfigurationError::NotFound { tried })
    }
}

fn existing(path: PathBuf, origin: &str) -> Result<PathBuf, ConfigurationError> {
    if path.exists() {
        Ok(path)
    } else {
        Err(ConfigurationError::invalid(
            origin,
            format!("points to non-existent file: {}", path.display()),
        ))
    }
}

/// Read and deserialize a RON configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid for `T`.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigurationError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    ron::from_str(&content).map_err(|source| ConfigurationError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
