//! Periodic cache sweep
//!
//! Runs in the background and purges expired entries plus anything stored
//! longer ago than a fixed maximum age, reporting each pass over a tokio
//! channel.

use chrono::Duration as ChronoDuration;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::cache::TtlStore;

/// Messages sent from the sweep task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepMessage {
    /// A sweep pass finished
    Completed {
        /// Entries removed because their TTL had elapsed
        expired: usize,
        /// Entries removed because they were older than the maximum age
        stale: usize,
    },
}

/// Configuration for the sweep
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Time between passes
    pub interval: Duration,
    /// Entries stored longer ago than this are removed regardless of TTL
    pub max_age: Duration,
    /// Whether the sweep runs at all
    pub enabled: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(24 * 60 * 60), // daily
            max_age: Duration::from_secs(24 * 60 * 60),
            enabled: true,
        }
    }
}

/// Runs a single sweep pass over `store`
pub fn sweep_once(store: &TtlStore, max_age: Duration) -> SweepMessage {
    let expired = store.purge_expired();
    let max_age = ChronoDuration::from_std(max_age).unwrap_or(ChronoDuration::MAX);
    let stale = store.purge_stale("", max_age);
    SweepMessage::Completed { expired, stale }
}

/// Handle for controlling the background sweep
pub struct SweepHandle {
    /// Channel for receiving sweep reports
    pub receiver: mpsc::Receiver<SweepMessage>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl SweepHandle {
    /// Creates a new SweepHandle and spawns the sweep task
    ///
    /// # Arguments
    /// * `store` - The store to sweep
    /// * `config` - Interval and age limit
    ///
    /// # Returns
    /// A SweepHandle that receives a report after every pass
    pub fn spawn(store: TtlStore, config: SweepConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        if config.enabled {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let report = sweep_once(&store, config.max_age);
                            if let SweepMessage::Completed { expired, stale } = report {
                                info!(expired, stale, remaining = store.len(), "cache sweep completed");
                            }
                            if msg_tx.try_send(report).is_err() {
                                warn!("sweep report dropped, receiver is full or gone");
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            });
        }

        Self {
            receiver: msg_rx,
            shutdown_tx,
        }
    }

    /// Stops the sweep task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

/// Checks for a pending sweep report without blocking
///
/// # Returns
/// * `Some(SweepMessage)` if a report was available
/// * `None` if no reports are pending
pub fn try_recv(handle: &mut SweepHandle) -> Option<SweepMessage> {
    handle.receiver.try_recv().ok()
}
