//! Health checking for Lookout
//!
//! Components describe how to check a dependency as a [`HealthProbe`] and
//! register it with a [`HealthScheduler`]. Once running, the scheduler
//! executes every probe on its own schedule and publishes the latest results
//! as an immutable [`HealthSnapshot`], which [`router`] serves over HTTP.
//!
//! # Endpoints
//!
//! - **`/admin/health`** - 200 with the snapshot when every probe is healthy,
//!   503 with the snapshot otherwise
//! - **`/admin/alive`** - 200 while the process can answer requests
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use lookout_common::Signal;
//! use lookout_health::{CheckOutcome, HealthProbe, HealthScheduler};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let scheduler = HealthScheduler::new();
//! scheduler.register(
//!     HealthProbe::new("disk", || async { Ok(CheckOutcome::healthy()) })
//!         .with_initial_delay(Duration::from_secs(3))
//!         .with_period(Duration::from_secs(25)),
//! )?;
//!
//! let (shutdown, receiver) = tokio::sync::broadcast::channel(1);
//! scheduler.run(receiver)?;
//! let app = lookout_health::router(scheduler.handle());
//! # drop(app);
//!
//! shutdown.send(Signal::Shutdown)?;
//! scheduler.stopped().await;
//! # Ok(())
//! # }
//! ```

mod error;
mod probe;
mod routes;
mod scheduler;
mod snapshot;

pub use error::{HealthError, ProbeError};
pub use probe::{Check, CheckOutcome, HealthProbe};
pub use routes::{ALIVE_PATH, HEALTH_PATH, router};
pub use scheduler::HealthScheduler;
pub use snapshot::{CheckResult, CheckStatus, HealthHandle, HealthSnapshot};
