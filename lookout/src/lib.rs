//! Lookout: keeps watch over a broker cluster
//!
//! [`compose`] turns a [`ServiceConfig`] into a [`Service`]: it builds the
//! logger, the metrics provider and the cluster client (failing fast when no
//! broker answers) plus the cluster overview service. [`Service::start`]
//! then registers metrics, starts the client's metadata refresher, runs the
//! cluster connectivity probe every 25 seconds and serves HTTP until a
//! [`Signal::Shutdown`](lookout_common::Signal) arrives.
//!
//! ```rust,no_run
//! use lookout::{ServiceConfig, compose};
//!
//! # async fn example(config: ServiceConfig) -> Result<(), lookout::ServiceError> {
//! let service = compose(config).await?;
//!
//! let (_shutdown, receiver) = tokio::sync::broadcast::channel(16);
//! service.start(receiver).await?;
//! # Ok(())
//! # }
//! ```

mod composer;
mod config;
pub mod connectivity;
mod error;
pub mod overview;
pub mod routes;
mod service;
#[cfg(unix)]
pub mod signal;

pub use composer::compose;
pub use config::ServiceConfig;
pub use error::ServiceError;
pub use service::Service;
