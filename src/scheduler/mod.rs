//! Cadence-driven reconciliation loop
//!
//! Callers needing responsiveness trigger cycles from a single scheduler
//! task at a chosen cadence; each tick runs one full pass and is atomic
//! from the point of view of concurrent readers. Collaborator callbacks
//! are synchronous, so their latency bounds the cycle latency.

use crate::reconciler::{DiffTuple, TransientInterface};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// A non-empty reconciliation diff, stamped when the cycle finished.
#[derive(Debug, Clone)]
pub struct DiffEvent {
    /// Kind label of the interface that produced the diff
    pub kind: String,
    pub at: DateTime<Utc>,
    pub diff: DiffTuple,
}

/// Periodically reconciles one interface and emits non-empty diffs.
pub struct Scheduler<T, H> {
    interface: Arc<TransientInterface<T, H>>,
    interval: Duration,
}

impl<T, H> Scheduler<T, H>
where
    T: Send + Sync + 'static,
    H: Send + Sync + 'static,
{
    pub fn new(interface: Arc<TransientInterface<T, H>>, interval: Duration) -> Self {
        Self {
            interface,
            interval,
        }
    }

    /// Spawn the cadence loop; the returned handle stops it gracefully.
    pub fn spawn(self, events: mpsc::Sender<DiffEvent>) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(self.run(events, shutdown_rx));
        SchedulerHandle {
            shutdown: shutdown_tx,
            handle,
        }
    }

    async fn run(self, events: mpsc::Sender<DiffEvent>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let diff = self.interface.reconcile();
                    if diff.is_empty() {
                        continue;
                    }
                    let event = DiffEvent {
                        kind: self.interface.desc().to_string(),
                        at: Utc::now(),
                        diff,
                    };
                    if events.send(event).await.is_err() {
                        tracing::info!("Diff receiver dropped, stopping {} scheduler", self.interface.desc());
                        break;
                    }
                }
                _ = shutdown.changed() => {
                    tracing::info!("Stopping {} scheduler", self.interface.desc());
                    break;
                }
            }
        }
    }
}

/// Running scheduler task; a cycle in progress always runs to completion.
pub struct SchedulerHandle {
    shutdown: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl SchedulerHandle {
    /// Signal shutdown and wait for the loop to finish its current cycle.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.handle.await;
    }
}
