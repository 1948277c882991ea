//! HTTP listener configuration

use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use lookout_common::ConfigurationError;
use serde::Deserialize;

/// The `http_server` section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpServerConfig {
    /// Address to bind
    ///
    /// Common values:
    /// - `0.0.0.0` (IPv4 any address)
    /// - `::` (IPv6 any address)
    /// - `127.0.0.1` (localhost only)
    #[serde(default = "default_listen_address")]
    pub listen_address: String,

    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Serve HTTPS instead of plain HTTP
    #[serde(default)]
    pub tls: Option<HttpTlsConfig>,

    /// How long in-flight requests may run after shutdown before they are
    /// dropped.
    ///
    /// Default: 30 seconds
    #[serde(default = "default_graceful_shutdown_timeout")]
    pub graceful_shutdown_timeout_secs: u64,

    /// Upper bound on handling a single request.
    ///
    /// Default: 30 seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

/// Certificate and key for HTTPS, both PEM encoded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HttpTlsConfig {
    #[serde(default)]
    pub cert_file: Option<PathBuf>,

    #[serde(default)]
    pub key_file: Option<PathBuf>,
}

fn default_listen_address() -> String {
    "0.0.0.0".to_string()
}

const fn default_listen_port() -> u16 {
    8080
}

const fn default_graceful_shutdown_timeout() -> u64 {
    30
}

const fn default_request_timeout() -> u64 {
    30
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_address: default_listen_address(),
            listen_port: default_listen_port(),
            tls: None,
            graceful_shutdown_timeout_secs: default_graceful_shutdown_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl HttpServerConfig {
    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns an error if `listen_address` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigurationError> {
        let ip: IpAddr = self.listen_address.parse().map_err(|_| {
            ConfigurationError::invalid(
                "http_server.listen_address",
                format!("{:?} is not an IP address", self.listen_address),
            )
        })?;

        Ok(SocketAddr::new(ip, self.listen_port))
    }

    #[must_use]
    pub const fn graceful_shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.graceful_shutdown_timeout_secs)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check the options without touching the network or filesystem.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.socket_addr()?;

        if self.request_timeout_secs == 0 {
            return Err(ConfigurationError::invalid(
                "http_server.request_timeout_secs",
                "must be greater than zero",
            ));
        }

        if let Some(tls) = &self.tls {
            if tls.cert_file.is_none() {
                return Err(ConfigurationError::MissingField("http_server.tls.cert_file"));
            }
            if tls.key_file.is_none() {
                return Err(ConfigurationError::MissingField("http_server.tls.key_file"));
            }
        }

        Ok(())
    }
}
