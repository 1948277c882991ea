//! Process signal handling

use lookout_common::{Signal, internal};
use tokio::{
    signal::unix::{SignalKind, signal},
    sync::broadcast,
};

/// Wait for SIGINT or SIGTERM, then broadcast [`Signal::Shutdown`].
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
pub async fn shutdown_on_signal(sender: &broadcast::Sender<Signal>) -> std::io::Result<()> {
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered -- Enter it again to force shutdown");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    if sender.send(Signal::Shutdown).is_err() {
        tracing::debug!("Nothing is listening for shutdown");
    }

    Ok(())
}
