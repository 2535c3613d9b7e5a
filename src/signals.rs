//! # Cross-platform OS signal handling.
//!
//! [`wait_for_shutdown_signal`] completes when the process receives a termination signal;
//! [`shutdown_token`] turns that into a [`CancellationToken`] that any component here
//! accepts as a stop source.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]
//!
//! ## Example
//! ```no_run
//! use chankit::{Group, TaskError, signals};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let group = Group::new();
//! let shutdown = signals::shutdown_token(None);
//!
//! group.add("ticker", move |stop| async move {
//!     tokio::select! {
//!         _ = stop.cancelled() => {}
//!         _ = shutdown.cancelled() => {}
//!     }
//!     Ok::<_, TaskError>(())
//! });
//! group.wait().await;
//! # }
//! ```

use tokio_util::sync::CancellationToken;

use crate::events::{Bus, Event, EventKind, emit};

/// Waits for a termination signal.
///
/// Each call creates independent signal listeners.
/// Returns `Err` if signal registration fails.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Returns `Err` if signal registration fails.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}

/// Returns a token cancelled on the first termination signal.
///
/// Publishes [`EventKind::ShutdownRequested`] to `bus` when it fires. If signal handlers
/// cannot be installed the token is never cancelled by a signal; the failure is logged and
/// published as [`EventKind::SignalUnavailable`].
/// Must be called from within a tokio runtime.
pub fn shutdown_token(bus: Option<Bus>) -> CancellationToken {
    let token = CancellationToken::new();
    tokio::spawn(fire_on_signal(wait_for_shutdown_signal(), token.clone(), bus));
    token
}

async fn fire_on_signal<F>(signal: F, fire: CancellationToken, bus: Option<Bus>)
where
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        _ = fire.cancelled() => {}
        res = signal => match res {
            Ok(()) => {
                emit(&bus, || Event::now(EventKind::ShutdownRequested));
                fire.cancel();
            }
            Err(e) => {
                tracing::warn!(error = %e, "shutdown signal handlers unavailable");
                emit(&bus, || Event::now(EventKind::SignalUnavailable).with_reason(e.to_string()));
            }
        },
    }
}
