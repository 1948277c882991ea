use std::str::FromStr;

use serde::Deserialize;
use tracing::{Dispatch, metadata::LevelFilter};
use tracing_subscriber::{
    Layer, Registry, filter::FilterFn, fmt::time::ChronoUtc,
    prelude::__tracing_subscriber_SubscriberExt,
};

use crate::ConfigurationError;

#[macro_export]
macro_rules! log {
    ($level:expr, $span:expr, $($msg:expr),*) => {{
        let span = $crate::tracing::span!($level, $span);
        let _enter = span.enter();

        $crate::tracing::event!($level, $($msg),*)
    }};
}

#[macro_export]
macro_rules! internal {
    (level = $level:ident, $($msg:expr),*) => {
        $crate::log!($crate::tracing::Level::$level, "internal", $($msg),*)
    };

    ($($msg:expr),*) => {
        $crate::internal!(level = TRACE, $($msg),*)
    };
}

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Single-line human readable output.
    #[default]
    Compact,
    /// One JSON object per line.
    Json,
}

/// The `logging` section of the service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Maximum level to emit: `off`, `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Colourise compact output.
    #[serde(default = "default_ansi")]
    pub ansi: bool,

    /// Also emit events from dependencies (hyper, rustls, ...), not only
    /// `lookout*` targets.
    #[serde(default)]
    pub include_dependencies: bool,
}

fn default_level() -> String {
    "info".to_string()
}

const fn default_ansi() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            ansi: default_ansi(),
            include_dependencies: false,
        }
    }
}

impl LoggingConfig {
    /// Parse the configured level.
    ///
    /// # Errors
    ///
    /// Returns an error if `level` is not a known level name.
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigurationError> {
        LevelFilter::from_str(self.level.trim())
            .map_err(|e| ConfigurationError::invalid("logging.level", e.to_string()))
    }
}

/// Build the service logger.
///
/// The returned [`Dispatch`] is not installed globally; callers attach it to
/// the tasks they spawn (or install it as the process default themselves).
///
/// # Errors
///
/// Returns an error if the configured level is invalid.
pub fn dispatch(config: &LoggingConfig) -> Result<Dispatch, ConfigurationError> {
    let level = config.level_filter()?;
    let include_dependencies = config.include_dependencies;
    let targets = FilterFn::new(move |metadata| {
        include_dependencies || metadata.target().starts_with("lookout")
    });

    let dispatch = match config.format {
        LogFormat::Compact => Dispatch::new(
            Registry::default().with(
                tracing_subscriber::fmt::layer()
                    .with_file(false)
                    .with_line_number(false)
                    .compact()
                    .with_ansi(config.ansi)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_filter(level)
                    .with_filter(targets),
            ),
        ),
        LogFormat::Json => Dispatch::new(
            Registry::default().with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_filter(level)
                    .with_filter(targets),
            ),
        ),
    };

    Ok(dispatch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level_filter().expect("valid"), LevelFilter::INFO);
        assert_eq!(config.format, LogFormat::Compact);
    }

    #[test]
    fn test_invalid_level_is_a_configuration_error() {
        let config = LoggingConfig {
            level: "loud".to_string(),
            ..LoggingConfig::default()
        };

        let err = dispatch(&config).expect_err("unknown level");
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_json_dispatch_can_be_scoped() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Json,
            ..LoggingConfig::default()
        };

        let dispatch = dispatch(&config).expect("valid config");
        tracing::dispatcher::with_default(&dispatch, || {
            crate::internal!(level = INFO, "scoped logger {}", "works");
        });
    }

    #[test]
    fn test_format_deserializes_snake_case() {
        let config: LoggingConfig =
            ron::from_str(r#"(level: "warn", format: json)"#).expect("valid RON");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.level_filter().expect("valid"), LevelFilter::WARN);
        assert!(config.ansi);
    }
}
