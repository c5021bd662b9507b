use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::version::build_info;

const REQUEST_GRACE_PERIOD: Duration = Duration::from_secs(10);

/// Spawns a task that listens for SIGINT and SIGTERM and sends a shutdown signal via a watch.
///
/// Returns the join handle, the sender (for programmatic shutdown), and the receiver.
/// If the signal handlers cannot be installed, only programmatic shutdown remains.
pub fn graceful_shutdown_blocker() -> (JoinHandle<()>, watch::Sender<()>, watch::Receiver<()>) {
    let (tx, rx) = tokio::sync::watch::channel(());
    let signal_tx = tx.clone();
    let mut programmatic_rx = rx.clone();

    let handle = tokio::spawn(async move {
        let signals = signal(SignalKind::interrupt())
            .and_then(|sigint| Ok((sigint, signal(SignalKind::terminate())?)));

        match signals {
            Ok((mut sigint, mut sigterm)) => {
                tokio::select! {
                    _ = sigint.recv() => {
                        tracing::debug!("gracefully exiting immediately on SIGINT");
                    }
                    _ = sigterm.recv() => {
                        tokio::time::sleep(REQUEST_GRACE_PERIOD).await;
                        tracing::debug!("initiating graceful shutdown with delay on SIGTERM");
                    }
                    _ = programmatic_rx.changed() => {
                        tracing::debug!("shutdown requested");
                    }
                }
            }
            Err(e) => {
                tracing::warn!("failed to install signal handlers: {}", e);
                let _ = programmatic_rx.changed().await;
            }
        }

        // Tell every server still running that it is time to drain and stop.
        let _ = signal_tx.send(());
    });

    (handle, tx, rx)
}

/// Registers a panic hook that logs panics using the `tracing` crate
pub fn register_panic_logger() {
    std::panic::set_hook(Box::new(|panic| match panic.location() {
        Some(loc) => {
            tracing::error!(
                message = %panic,
                panic.file = loc.file(),
                panic.line = loc.line(),
                panic.column = loc.column(),
            );
        }
        None => tracing::error!(message = %panic),
    }));
}

pub fn report_build_info() {
    let build = build_info();

    tracing::info!(
        build_profile = build.build_profile,
        repo_version = build.repo_version,
        version = build.version,
        "service starting up"
    );
}
