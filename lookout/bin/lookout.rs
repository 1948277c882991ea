#![allow(clippy::must_use_candidate)]

#[cfg(not(any(target_os = "macos", unix)))]
compile_error!("Only macos and unix are currently supported");

use std::path::PathBuf;

use clap::Parser;
use lookout::{ServiceConfig, compose, signal};
use lookout_common::config::{self, ConfigLocator};
use tokio::sync::broadcast;

/// Watches a broker cluster and reports its health over HTTP
#[derive(Debug, Parser)]
#[command(name = "lookout", version, about)]
struct Args {
    /// Configuration file; otherwise `LOOKOUT_CONFIG`, then
    /// `./lookout.config.ron`, then `/etc/lookout/lookout.config.ron`
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let locator = ConfigLocator::new(
        "LOOKOUT_CONFIG",
        [
            PathBuf::from("./lookout.config.ron"),
            PathBuf::from("/etc/lookout/lookout.config.ron"),
        ],
    );
    let path = locator.locate(args.config.as_deref())?;
    let mut service_config: ServiceConfig = config::load(&path)?;

    if let Ok(level) = std::env::var("LOG_LEVEL") {
        service_config.logging.level = level;
    }

    let service = compose(service_config).await?;
    tracing::dispatcher::set_global_default(service.logger().clone())?;
    tracing::info!(path = %path.display(), "Configuration loaded");

    let (shutdown, receiver) = broadcast::channel(16);
    tokio::spawn(async move {
        if let Err(error) = signal::shutdown_on_signal(&shutdown).await {
            tracing::error!(%error, "Unable to listen for shutdown signals");
            return;
        }

        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Forced shutdown");
            std::process::exit(130);
        }
    });

    service.start(receiver).await?;

    Ok(())
}
