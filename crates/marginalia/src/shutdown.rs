// SPDX-FileCopyrightText: 2026 Marginalia Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown for `marginalia watch`.
//!
//! SIGTERM and SIGINT cancel a [`CancellationToken`] that the watch loop
//! monitors. Pipeline runs still in flight are then drained so each one
//! reaches its status write before the process exits.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a token that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();

        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                        _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "cannot install SIGTERM handler, listening for Ctrl+C only");
                    let _ = ctrl_c.await;
                    info!("received SIGINT (Ctrl+C), initiating shutdown");
                }
            }
        }

        #[cfg(not(unix))]
        {
            let _ = ctrl_c.await;
            info!("received Ctrl+C, initiating shutdown");
        }

        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

/// Closes `runs` and waits up to `timeout` for the tracked runs to finish.
///
/// Returns how many runs were still active when the wait ended.
pub async fn drain_runs(runs: &TaskTracker, timeout: Duration) -> usize {
    runs.close();
    if runs.is_empty() {
        info!("no ingestion runs to drain");
        return 0;
    }

    info!(count = runs.len(), "waiting for ingestion runs to complete");
    match tokio::time::timeout(timeout, runs.wait()).await {
        Ok(()) => {
            info!("all ingestion runs drained");
            0
        }
        Err(_) => {
            let remaining = runs.len();
            warn!(remaining, "timeout reached, some ingestion runs interrupted");
            remaining
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn install_signal_handler_returns_live_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_with_no_runs_returns_immediately() {
        let runs = TaskTracker::new();
        assert_eq!(drain_runs(&runs, Duration::from_millis(10)).await, 0);
        assert!(runs.is_closed());
    }

    #[tokio::test]
    async fn drain_waits_for_in_flight_runs() {
        let runs = TaskTracker::new();
        let finished = Arc::new(AtomicBool::new(false));
        let flag = finished.clone();
        runs.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        assert_eq!(drain_runs(&runs, Duration::from_secs(5)).await, 0);
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn drain_gives_up_after_timeout() {
        let runs = TaskTracker::new();
        runs.spawn(std::future::pending::<()>());

        assert_eq!(drain_runs(&runs, Duration::from_millis(20)).await, 1);
    }
}
