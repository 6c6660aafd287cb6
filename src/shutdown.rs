//! Interrupt handling for graceful shutdown.
//!
//! The host subscribes to termination signals through a
//! [`CancellationToken`] and checks it between records. Nothing in flight
//! is cancelled; the run stops at the next check.

use std::io;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::checkpoint::LastSeen;

/// Wait for a shutdown signal (SIGINT or SIGTERM on Unix, Ctrl-C elsewhere).
///
/// Returns the name of the signal received.
#[cfg(unix)]
pub async fn shutdown_signal() -> io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };
    info!(message = "Signal received.", signal = name);
    Ok(name)
}

/// Wait for a shutdown signal (SIGINT or SIGTERM on Unix, Ctrl-C elsewhere).
///
/// Returns the name of the signal received.
#[cfg(not(unix))]
pub async fn shutdown_signal() -> io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    info!(message = "Signal received.", signal = "ctrl-c");
    Ok("ctrl-c")
}

/// Spawn a task that cancels the returned token on the first shutdown signal.
///
/// Must be called from within a Tokio runtime.
pub fn interrupt_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(_) => trigger.cancel(),
            Err(e) => error!("Failed to install signal handlers: {}", e),
        }
    });
    token
}

/// Notice printed when a run is stopped by a signal.
pub fn interrupt_notice() -> &'static str {
    "\n\nInterrupt received, stopping run\n\n"
}

/// Diagnostic dump of the last values handed to the logger.
pub fn render_diagnostics(last: &LastSeen) -> String {
    let body = serde_json::to_string_pretty(last).unwrap_or_else(|e| format!("<unavailable: {e}>"));
    format!("\n\nRun record:\n{body}\n\n")
}
