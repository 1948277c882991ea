//! Top-level service configuration

use lookout_cluster::ClusterConfig;
use lookout_common::{ConfigurationError, logging::LoggingConfig};
use lookout_metrics::MetricsConfig;
use lookout_server::HttpServerConfig;
use serde::Deserialize;

/// Everything the composer needs, as read from `lookout.config.ron`.
///
/// ```ron
/// (
///     cluster: (brokers: ["kafka-0:9092", "kafka-1:9092"]),
///     http_server: (listen_port: 8080),
///     logging: (level: "info", format: compact),
///     metrics_namespace: "lookout",
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub cluster: ClusterConfig,

    #[serde(default, alias = "httpServer")]
    pub http_server: HttpServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Prefix of every metric instrument
    #[serde(default = "default_metrics_namespace", alias = "metricsNamespace")]
    pub metrics_namespace: String,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_metrics_namespace() -> String {
    "lookout".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cluster: ClusterConfig::default(),
            http_server: HttpServerConfig::default(),
            logging: LoggingConfig::default(),
            metrics_namespace: default_metrics_namespace(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Check every section without touching the network or filesystem.
    ///
    /// # Errors
    ///
    /// Returns the first invalid option found.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.cluster.validate()?;
        self.http_server.validate()?;
        self.logging.level_filter()?;
        validate_namespace(&self.metrics_namespace)?;

        Ok(())
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
fn validate_namespace(namespace: &str) -> Result<(), ConfigurationError> {
    let mut chars = namespace.chars();
    let valid = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(
            "metrics_namespace",
            format!("{namespace:?} must match [A-Za-z_][A-Za-z0-9_]*"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use lookout_common::{config::load, logging::LogFormat};
    use pretty_assertions::assert_eq;

    use super::*;

    fn valid() -> ServiceConfig {
        ServiceConfig {
            cluster: ClusterConfig {
                brokers: vec!["kafka-0:9092".to_string()],
                ..ClusterConfig::default()
            },
            ..ServiceConfig::default()
        }
    }

    #[test]
    fn test_minimal_file() {
        let config: ServiceConfig =
            ron::from_str(r#"(cluster: (brokers: ["kafka-0:9092"]))"#).expect("valid RON");

        assert_eq!(config, valid());
        assert_eq!(config.metrics_namespace, "lookout");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_server_alias() {
        let config: ServiceConfig = ron::from_str(
            r#"(cluster: (brokers: ["kafka-0:9092"]), httpServer: (listen_port: 9100))"#,
        )
        .expect("valid RON");

        assert_eq!(config.http_server.listen_port, 9100);
    }

    #[test]
    fn test_metrics_namespace_alias() {
        let config: ServiceConfig = ron::from_str(
            r#"(cluster: (brokers: ["kafka-0:9092"]), metricsNamespace: "team_a")"#,
        )
        .expect("valid RON");

        assert_eq!(config.metrics_namespace, "team_a");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_documented_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"(
                cluster: (brokers: ["kafka-0:9092", "kafka-1:9092"]),
                http_server: (listen_port: 8080),
                logging: (level: "info", format: compact),
                metrics_namespace: "lookout",
            )"#
        )
        .expect("write");

        let config: ServiceConfig = load(file.path()).expect("valid file");

        assert_eq!(config.cluster.brokers, ["kafka-0:9092", "kafka-1:9092"]);
        assert_eq!(config.http_server.listen_port, 8080);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_brokers_is_rejected() {
        assert!(matches!(
            ServiceConfig::default().validate(),
            Err(ConfigurationError::MissingField("cluster.brokers"))
        ));
    }

    #[test]
    fn test_namespace_rules() {
        for namespace in ["lookout", "_private", "team_a1"] {
            assert!(validate_namespace(namespace).is_ok(), "{namespace}");
        }

        for namespace in ["", "1lookout", "look-out", "look.out"] {
            assert!(validate_namespace(namespace).is_err(), "{namespace}");
        }
    }

    #[test]
    fn test_invalid_log_level_is_rejected() {
        let mut config = valid();
        config.logging.level = "loud".to_string();

        let err = config.validate().expect_err("unknown level");
        assert!(err.to_string().contains("logging.level"));
    }
}
