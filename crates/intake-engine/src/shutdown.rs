// SPDX-FileCopyrightText: 2026 Intake Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shutdown coordination.
//!
//! SIGINT and SIGTERM cancel a [`CancellationToken`] watched by the engine
//! loop, the maintenance scheduler and the gateway. Steps already in flight
//! are drained before the process exits.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::guard::InFlightGuard;

/// Returns a token cancelled on the first SIGINT or SIGTERM.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        let signal = wait_for_signal().await;
        info!(signal, "shutdown requested");
        trigger.cancel();
    });

    token
}

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(e) => {
            error!(error = %e, "SIGTERM handler unavailable, listening for SIGINT only");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "Ctrl+C"
}

/// Waits up to `timeout` for in-flight contact steps to finish.
///
/// Returns the number of contacts still in flight when the wait ended.
pub async fn drain_in_flight(guard: &InFlightGuard, timeout: Duration) -> usize {
    if guard.is_empty() {
        info!("no in-flight steps to drain");
        return 0;
    }

    info!(count = guard.len(), "waiting for in-flight steps to complete");

    let poll = async {
        while !guard.is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    };
    let _ = tokio::time::timeout(timeout, poll).await;

    let remaining = guard.len();
    if remaining == 0 {
        info!("all in-flight steps drained");
    } else {
        warn!(remaining, "timeout reached, some steps interrupted");
    }
    remaining
}
