//! The HTTP listener

use std::{fmt, future::IntoFuture, net::SocketAddr, time::Duration};

use axum::{Router, serve::Listener};
use lookout_common::{Signal, internal};
use tokio::{
    net::TcpListener,
    sync::{broadcast, oneshot},
    task::JoinHandle,
};
use tower_http::timeout::TimeoutLayer;
use tracing::instrument::WithSubscriber;

use crate::{HttpServerConfig, ServerError, tls};

enum Bound {
    Plain(TcpListener),
    Tls(tls::TlsListener),
}

/// A bound listener plus the routes it serves.
///
/// Binding and serving are separate so that bind failures surface before
/// the service reports itself as started.
pub struct RestServer {
    listener: Bound,
    router: Router,
    local_addr: SocketAddr,
    drain_timeout: Duration,
}

impl fmt::Debug for RestServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestServer")
            .field("local_addr", &self.local_addr)
            .field("tls", &matches!(self.listener, Bound::Tls(_)))
            .field("drain_timeout", &self.drain_timeout)
            .finish_non_exhaustive()
    }
}

impl RestServer {
    /// Bind the configured address and prepare `router` for serving.
    ///
    /// Every request is bounded by `request_timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the TLS material
    /// cannot be loaded, or the address cannot be bound.
    pub async fn bind(config: &HttpServerConfig, router: Router) -> Result<Self, ServerError> {
        config.validate()?;
        let address = config.socket_addr()?;

        let acceptor = config.tls.as_ref().map(tls::acceptor).transpose()?;

        let listener = TcpListener::bind(address)
            .await
            .map_err(|e| ServerError::Bind {
                address: address.to_string(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;

        tracing::info!(
            address = %local_addr,
            tls = acceptor.is_some(),
            "HTTP server bound successfully"
        );

        let listener = match acceptor {
            Some(acceptor) => Bound::Tls(tls::TlsListener::new(listener, acceptor)),
            None => Bound::Plain(listener),
        };

        let router = router.layer(TimeoutLayer::new(config.request_timeout()));

        Ok(Self {
            listener,
            router,
            local_addr,
            drain_timeout: config.graceful_shutdown_timeout(),
        })
    }

    /// The address actually bound, which differs from the configured one
    /// when port 0 was requested
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` fires, then stop accepting and give in-flight
    /// requests up to the graceful shutdown timeout to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if the serve loop fails.
    pub async fn serve(self, mut shutdown: broadcast::Receiver<Signal>) -> Result<(), ServerError> {
        tracing::info!(address = %self.local_addr, "HTTP server starting");

        let (drain, draining) = oneshot::channel();
        let mut server = match self.listener {
            Bound::Plain(listener) => spawn_serve(listener, self.router, draining),
            Bound::Tls(listener) => spawn_serve(listener, self.router, draining),
        };

        tokio::select! {
            result = &mut server => return finished(result),
            sig = shutdown.recv() => {
                tracing::info!(signal = ?sig, "HTTP server received shutdown signal");
            }
        }

        // The serve task may already be gone, in which case there is nothing to drain
        let _ = drain.send(());

        match tokio::time::timeout(self.drain_timeout, &mut server).await {
            Ok(result) => finished(result),
            Err(_) => {
                server.abort();
                tracing::warn!(
                    timeout = ?self.drain_timeout,
                    "In-flight requests did not finish in time, dropping them"
                );
                Ok(())
            }
        }
    }
}

fn spawn_serve<L>(
    listener: L,
    router: Router,
    draining: oneshot::Receiver<()>,
) -> JoinHandle<std::io::Result<()>>
where
    L: Listener,
    L::Addr: fmt::Debug,
{
    tokio::spawn(
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = draining.await;
            })
            .into_future()
            .with_current_subscriber(),
    )
}

fn finished(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), ServerError> {
    match result {
        Ok(Ok(())) => {
            internal!(level = INFO, "HTTP server stopped");
            Ok(())
        }
        Ok(Err(error)) => {
            tracing::error!(%error, "HTTP server failed");
            Err(ServerError::Serve(error))
        }
        Err(error) => Err(ServerError::Task(error.to_string())),
    }
}
