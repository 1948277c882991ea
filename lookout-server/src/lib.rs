//! HTTP listener for Lookout
//!
//! [`RestServer`] binds the configured address (optionally serving HTTPS)
//! and serves an axum [`Router`](axum::Router) until shutdown, then drains
//! in-flight requests for a bounded time.
//!
//! ```rust,no_run
//! use axum::{Router, routing::get};
//! use lookout_server::{HttpServerConfig, RestServer};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let router = Router::new().route("/ping", get(|| async { "pong" }));
//! let server = RestServer::bind(&HttpServerConfig::default(), router).await?;
//!
//! let (_shutdown, receiver) = tokio::sync::broadcast::channel(1);
//! server.serve(receiver).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod server;
mod tls;

pub use config::{HttpServerConfig, HttpTlsConfig};
pub use error::ServerError;
pub use server::RestServer;
