//! Background TTL Reaper
//!
//! Expiry is enforced lazily on every access, which keeps reads correct but
//! lets entries that are never touched again sit in memory forever. The
//! reaper bounds that: a background task wakes on a fixed cadence, takes the
//! store exclusively, and drops every entry whose deadline has passed.
//!
//! The task runs until the [`Reaper`] handle is dropped or
//! [`Reaper::stop`] is called.

use crate::storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// How often the reaper sweeps the store.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Handle to the running reaper task. Dropping it stops the task.
#[derive(Debug)]
pub struct Reaper {
    shutdown_tx: watch::Sender<bool>,
}

impl Reaper {
    /// Spawns the reaper over `store`, sweeping every `interval`.
    pub fn start(store: Arc<Store>, interval: Duration) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        tokio::spawn(reap_loop(store, interval, shutdown_rx));
        info!(interval_ms = interval.as_millis() as u64, "ttl reaper started");
        Self { shutdown_tx }
    }

    /// Stops the reaper task. Called automatically on drop.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}

impl Drop for Reaper {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn reap_loop(store: Arc<Store>, interval: Duration, mut shutdown_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("ttl reaper stopping");
                    return;
                }
            }
        }

        let reclaimed = store.purge_expired();
        if reclaimed > 0 {
            debug!(reclaimed, remaining = store.key_count(), "swept expired keys");
        }
    }
}

/// Starts the reaper with the default cadence.
pub fn start_reaper(store: Arc<Store>) -> Reaper {
    Reaper::start(store, SWEEP_INTERVAL)
}
