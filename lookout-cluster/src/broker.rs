use std::fmt;

use chrono::{DateTime, Utc};
use lookout_common::ConfigurationError;
use serde::Serialize;

/// A broker endpoint, `host:port`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BrokerAddress {
    host: String,
    port: u16,
}

impl BrokerAddress {
    /// Parse `host:port`, `ip:port` or `[ipv6]:port`.
    ///
    /// # Errors
    ///
    /// Returns an error if the port is missing or not a number, or the host is empty.
    pub fn parse(address: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: &str| {
            ConfigurationError::invalid("cluster.brokers", format!("{address:?} {reason}"))
        };

        let (host, port) = address
            .trim()
            .rsplit_once(':')
            .ok_or_else(|| invalid("is missing a port"))?;

        let host = host.trim_start_matches('[').trim_end_matches(']');
        if host.is_empty() {
            return Err(invalid("is missing a host"));
        }

        let port = port
            .parse::<u16>()
            .map_err(|_| invalid("has an invalid port"))?;
        if port == 0 {
            return Err(invalid("has port 0"));
        }

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// What the client last learned about one broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrokerStatus {
    pub address: String,
    pub reachable: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl BrokerStatus {
    pub(crate) fn unchecked(address: &BrokerAddress) -> Self {
        Self {
            address: address.to_string(),
            reachable: false,
            last_checked_at: None,
            last_error: None,
        }
    }
}
