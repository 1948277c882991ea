//! Cluster connection configuration

use std::{path::PathBuf, time::Duration};

use lookout_common::ConfigurationError;
use serde::Deserialize;

use crate::BrokerAddress;

/// The `cluster` section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClusterConfig {
    /// Seed brokers, `host:port`
    #[serde(default)]
    pub brokers: Vec<String>,

    /// Identifier this client presents to the cluster
    ///
    /// Default: `lookout`
    #[serde(default = "default_client_id")]
    pub client_id: String,

    /// Timeout for a single broker dial (TCP connect plus TLS handshake).
    ///
    /// Default: 10 seconds
    #[serde(default = "default_dial_timeout")]
    pub dial_timeout_secs: u64,

    /// How often the client re-dials every broker to refresh its metadata.
    ///
    /// Default: 60 seconds
    #[serde(default = "default_metadata_refresh")]
    pub metadata_refresh_secs: u64,

    #[serde(default)]
    pub tls: ClusterTlsConfig,
}

/// TLS options for broker connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClusterTlsConfig {
    #[serde(default)]
    pub enabled: bool,

    /// PEM bundle of the certificate authorities that sign broker certificates
    #[serde(default)]
    pub ca_file: Option<PathBuf>,

    /// Name to verify broker certificates against, instead of each broker's host
    #[serde(default)]
    pub server_name: Option<String>,
}

fn default_client_id() -> String {
    "lookout".to_string()
}

const fn default_dial_timeout() -> u64 {
    10
}

const fn default_metadata_refresh() -> u64 {
    60
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            brokers: Vec::new(),
            client_id: default_client_id(),
            dial_timeout_secs: default_dial_timeout(),
            metadata_refresh_secs: default_metadata_refresh(),
            tls: ClusterTlsConfig::default(),
        }
    }
}

impl ClusterConfig {
    #[must_use]
    pub const fn dial_timeout(&self) -> Duration {
        Duration::from_secs(self.dial_timeout_secs)
    }

    #[must_use]
    pub const fn metadata_refresh(&self) -> Duration {
        Duration::from_secs(self.metadata_refresh_secs)
    }

    /// Parse every seed broker.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no brokers or any of them is malformed.
    pub fn broker_addresses(&self) -> Result<Vec<BrokerAddress>, ConfigurationError> {
        if self.brokers.is_empty() {
            return Err(ConfigurationError::MissingField("cluster.brokers"));
        }

        self.brokers
            .iter()
            .map(|b| BrokerAddress::parse(b))
            .collect()
    }

    /// Check the cluster options without touching the network or filesystem.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.broker_addresses()?;

        if self.client_id.trim().is_empty() {
            return Err(ConfigurationError::MissingField("cluster.client_id"));
        }

        if self.dial_timeout_secs == 0 {
            return Err(ConfigurationError::invalid(
                "cluster.dial_timeout_secs",
                "must be greater than 0",
            ));
        }

        if self.metadata_refresh_secs == 0 {
            return Err(ConfigurationError::invalid(
                "cluster.metadata_refresh_secs",
                "must be greater than 0",
            ));
        }

        if self.tls.enabled && self.tls.ca_file.is_none() {
            return Err(ConfigurationError::MissingField("cluster.tls.ca_file"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn config(brokers: &[&str]) -> ClusterConfig {
        ClusterConfig {
            brokers: brokers.iter().map(ToString::to_string).collect(),
            ..ClusterConfig::default()
        }
    }

    #[test]
    fn test_defaults_from_ron() {
        let config: ClusterConfig =
            ron::from_str(r#"(brokers: ["kafka:9092"])"#).expect("valid RON");

        assert_eq!(config.client_id, "lookout");
        assert_eq!(config.dial_timeout(), Duration::from_secs(10));
        assert_eq!(config.metadata_refresh(), Duration::from_secs(60));
        assert_eq!(config.tls, ClusterTlsConfig::default());
    }

    #[test]
    fn test_validate_requires_brokers() {
        let err = config(&[]).validate().expect_err("no brokers");
        assert!(matches!(
            err,
            ConfigurationError::MissingField("cluster.brokers")
        ));
    }

    #[test]
    fn test_validate_rejects_malformed_broker() {
        let err = config(&["kafka:9092", "kafka-1"])
            .validate()
            .expect_err("missing port");
        assert!(err.to_string().contains("kafka-1"));
    }

    #[test]
    fn test_validate_rejects_zero_timeouts() {
        let mut cfg = config(&["kafka:9092"]);
        cfg.dial_timeout_secs = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = config(&["kafka:9092"]);
        cfg.metadata_refresh_secs = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_validate_tls_requires_ca_file() {
        let mut cfg = config(&["kafka:9093"]);
        cfg.tls.enabled = true;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigurationError::MissingField("cluster.tls.ca_file"))
        ));

        cfg.tls.ca_file = Some(PathBuf::from("/etc/ssl/kafka-ca.pem"));
        assert!(cfg.validate().is_ok());
    }
}
