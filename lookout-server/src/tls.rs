//! HTTPS support: an axum listener that completes the TLS handshake

use std::{fs::File, io::BufReader, net::SocketAddr, path::Path, sync::Arc, time::Duration};

use axum::serve::Listener;
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinSet,
};
use tokio_rustls::{
    TlsAcceptor,
    rustls::{
        ServerConfig,
        pki_types::{CertificateDer, PrivateKeyDer},
    },
    server::TlsStream,
};

use crate::{HttpTlsConfig, ServerError};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

type Handshake = (Result<std::io::Result<TlsStream<TcpStream>>, tokio::time::error::Elapsed>, SocketAddr);

/// Build an acceptor from the configured certificate chain and key
pub(crate) fn acceptor(config: &HttpTlsConfig) -> Result<TlsAcceptor, ServerError> {
    let cert_file = config
        .cert_file
        .as_deref()
        .ok_or(lookout_common::ConfigurationError::MissingField("http_server.tls.cert_file"))?;
    let key_file = config
        .key_file
        .as_deref()
        .ok_or(lookout_common::ConfigurationError::MissingField("http_server.tls.key_file"))?;

    let server_config = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(load_certs(cert_file)?, load_key(key_file)?)
        .map_err(|e| ServerError::Tls {
            path: cert_file.display().to_string(),
            reason: e.to_string(),
        })?;

    Ok(TlsAcceptor::from(Arc::new(server_config)))
}

fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ServerError> {
    let tls_error = |reason: String| ServerError::Tls {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| tls_error(e.to_string()))?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| tls_error(e.to_string()))?;

    if certs.is_empty() {
        return Err(tls_error("contains no certificates".to_string()));
    }

    Ok(certs)
}

fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ServerError> {
    let tls_error = |reason: String| ServerError::Tls {
        path: path.display().to_string(),
        reason,
    };

    let file = File::open(path).map_err(|e| tls_error(e.to_string()))?;
    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| tls_error(e.to_string()))?
        .ok_or_else(|| {
            tls_error("Unable to determine key file format (expected PKCS1, PKCS8, or SEC1)".to_string())
        })
}

/// Accepts TCP connections and hands axum only those that finish the TLS
/// handshake.
///
/// Handshakes run on their own tasks so a slow client cannot hold up the
/// accept loop.
pub struct TlsListener {
    inner: TcpListener,
    acceptor: TlsAcceptor,
    handshakes: JoinSet<Handshake>,
}

impl TlsListener {
    pub(crate) fn new(inner: TcpListener, acceptor: TlsAcceptor) -> Self {
        Self {
            inner,
            acceptor,
            handshakes: JoinSet::new(),
        }
    }

    fn start_handshake(&mut self, stream: TcpStream, peer: SocketAddr) {
        let acceptor = self.acceptor.clone();
        self.handshakes.spawn(async move {
            (
                tokio::time::timeout(HANDSHAKE_TIMEOUT, acceptor.accept(stream)).await,
                peer,
            )
        });
    }
}

impl Listener for TlsListener {
    type Io = TlsStream<TcpStream>;
    type Addr = SocketAddr;

    async fn accept(&mut self) -> (Self::Io, Self::Addr) {
        loop {
            tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok((stream, peer)) => self.start_handshake(stream, peer),
                    Err(error) => accept_failed(error).await,
                },
                Some(finished) = self.handshakes.join_next(), if !self.handshakes.is_empty() => {
                    match finished {
                        Ok((Ok(Ok(stream)), peer)) => return (stream, peer),
                        Ok((Ok(Err(error)), peer)) => {
                            tracing::debug!(%peer, %error, "TLS handshake failed");
                        }
                        Ok((Err(_), peer)) => {
                            tracing::debug!(%peer, "TLS handshake timed out");
                        }
                        Err(error) => {
                            tracing::error!(%error, "TLS handshake task failed");
                        }
                    }
                }
            }
        }
    }

    fn local_addr(&self) -> std::io::Result<Self::Addr> {
        self.inner.local_addr()
    }
}

async fn accept_failed(error: std::io::Error) {
    use std::io::ErrorKind;

    if matches!(
        error.kind(),
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionAborted | ErrorKind::ConnectionReset
    ) {
        return;
    }

    // Typically "too many open files"; back off instead of spinning
    tracing::error!(%error, "Failed to accept connection");
    tokio::time::sleep(Duration::from_secs(1)).await;
}
