// SPDX-FileCopyrightText: 2026 Ticketline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Graceful shutdown coordination with signal handling.
//!
//! Installs handlers for SIGTERM and SIGINT (Ctrl+C), triggering a
//! [`CancellationToken`] that the intake loop monitors. Conversation lanes
//! finish their queued messages before the process exits.

use std::time::Duration;

use dashmap::DashMap;
use ticketline_core::types::InboundMessage;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

/// Installs signal handlers for SIGTERM and SIGINT.
///
/// Returns a [`CancellationToken`] that is cancelled when either signal is received.
pub fn install_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();

    tokio::spawn(async move {
        wait_for_signal().await;
        token_clone.cancel();
        debug!("shutdown signal handler completed");
    });

    token
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "cannot install SIGTERM handler, listening for Ctrl+C only");
            let _ = tokio::signal::ctrl_c().await;
            info!("received SIGINT (Ctrl+C), initiating shutdown");
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("received SIGINT (Ctrl+C), initiating shutdown");
        }
        _ = sigterm.recv() => {
            info!("received SIGTERM, initiating shutdown");
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received Ctrl+C, initiating shutdown");
}

/// Closes every conversation lane and waits up to `timeout` for their
/// queued messages to be processed.
///
/// Returns `true` when every lane finished in time.
pub async fn drain_lanes(
    lanes: &DashMap<String, UnboundedSender<InboundMessage>>,
    tracker: &TaskTracker,
    timeout: Duration,
) -> bool {
    let open = lanes.len();
    // Dropping the senders lets each lane drain its queue and exit.
    lanes.clear();
    tracker.close();

    if tracker.is_empty() {
        info!("no conversation lanes to drain");
        return true;
    }

    info!(lanes = open, tasks = tracker.len(), "waiting for conversation lanes to finish");
    match tokio::time::timeout(timeout, tracker.wait()).await {
        Ok(()) => {
            info!("all conversation lanes drained");
            true
        }
        Err(_) => {
            warn!(
                remaining = tracker.len(),
                "drain timeout reached, some messages were not processed"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn install_signal_handler_returns_token() {
        let token = install_signal_handler();
        assert!(!token.is_cancelled());
        token.cancel();
    }

    #[tokio::test]
    async fn drain_with_no_lanes_completes_immediately() {
        let lanes = DashMap::new();
        let tracker = TaskTracker::new();
        assert!(drain_lanes(&lanes, &tracker, Duration::from_millis(10)).await);
        assert!(tracker.is_closed());
    }

    #[tokio::test]
    async fn drain_waits_for_lane_to_empty_its_queue() {
        let lanes = DashMap::new();
        let tracker = TaskTracker::new();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<InboundMessage>();
        let processed = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = std::sync::Arc::clone(&processed);
        tracker.spawn(async move {
            while rx.recv().await.is_some() {
                counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            }
        });
        tx.send(InboundMessage::text("1@s.whatsapp.net", "a", "hi", 1)).unwrap();
        tx.send(InboundMessage::text("1@s.whatsapp.net", "b", "hi", 1)).unwrap();
        lanes.insert("1".to_string(), tx);

        assert!(drain_lanes(&lanes, &tracker, Duration::from_secs(5)).await);
        assert_eq!(processed.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert!(lanes.is_empty());
    }

    #[tokio::test]
    async fn drain_reports_timeout_for_stuck_lane() {
        let lanes = DashMap::new();
        let tracker = TaskTracker::new();
        tracker.spawn(tokio::time::sleep(Duration::from_secs(60)));
        assert!(!drain_lanes(&lanes, &tracker, Duration::from_millis(20)).await);
    }
}
