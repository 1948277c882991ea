use std::{fs::File, io::BufReader, path::Path, sync::Arc};

use lookout_common::ConfigurationError;
use tokio::net::TcpStream;
use tokio_rustls::{
    TlsConnector,
    rustls::{ClientConfig, RootCertStore, pki_types::ServerName},
};

use crate::{ClusterTlsConfig, DialError};

/// Performs the TLS handshake on freshly dialled broker connections.
#[derive(Clone)]
pub(crate) struct TlsDialer {
    connector: TlsConnector,
    server_name: Option<String>,
}

impl TlsDialer {
    /// Build a dialer when TLS is enabled.
    pub(crate) fn from_config(config: &ClusterTlsConfig) -> Result<Option<Self>, ConfigurationError> {
        if !config.enabled {
            return Ok(None);
        }

        let ca_file = config
            .ca_file
            .as_deref()
            .ok_or(ConfigurationError::MissingField("cluster.tls.ca_file"))?;

        let client_config = ClientConfig::builder()
            .with_root_certificates(load_roots(ca_file)?)
            .with_no_client_auth();

        Ok(Some(Self {
            connector: TlsConnector::from(Arc::new(client_config)),
            server_name: config.server_name.clone(),
        }))
    }

    pub(crate) async fn handshake(&self, host: &str, stream: TcpStream) -> Result<(), DialError> {
        let name = self.server_name.as_deref().unwrap_or(host).to_string();
        let server_name =
            ServerName::try_from(name.clone()).map_err(|_| DialError::ServerName(name))?;

        self.connector.connect(server_name, stream).await?;
        Ok(())
    }
}

fn load_roots(path: &Path) -> Result<RootCertStore, ConfigurationError> {
    let invalid = |reason: String| {
        ConfigurationError::invalid("cluster.tls.ca_file", format!("{}: {reason}", path.display()))
    };

    let file = File::open(path).map_err(|e| invalid(e.to_string()))?;

    let mut roots = RootCertStore::empty();
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        let cert = cert.map_err(|e| invalid(e.to_string()))?;
        roots.add(cert).map_err(|e| invalid(e.to_string()))?;
    }

    if roots.is_empty() {
        return Err(invalid("contains no certificates".to_string()));
    }

    Ok(roots)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_disabled_tls_builds_nothing() {
        let dialer = TlsDialer::from_config(&ClusterTlsConfig::default()).expect("valid");
        assert!(dialer.is_none());
    }

    #[test]
    fn test_missing_ca_file_is_a_configuration_error() {
        let config = ClusterTlsConfig {
            enabled: true,
            ca_file: Some(PathBuf::from("/nonexistent/ca.pem")),
            server_name: None,
        };

        let err = TlsDialer::from_config(&config).err().expect("missing file");
        assert!(err.to_string().contains("cluster.tls.ca_file"));
    }
}
