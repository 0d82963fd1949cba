//! Periodic liveness broadcast.
//!
//! Pushes the configured sentinel to every peer on a fixed interval. Peers
//! whose link has died are evicted by the broadcast itself. Interval,
//! sentinel and the on/off switch are read from the live config on every
//! pass, so a reload applies from the next tick.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::time;

use crate::bridge::peers::BroadcastReport;
use crate::bridge::switchboard::Switchboard;
use crate::config::SharedConfig;

pub struct LivenessBroadcaster {
    switchboard: Arc<Switchboard>,
    config: SharedConfig,
}

impl LivenessBroadcaster {
    pub fn new(switchboard: Arc<Switchboard>, config: SharedConfig) -> Self {
        Self {
            switchboard,
            config,
        }
    }

    /// One broadcast pass. `None` when liveness is disabled.
    pub fn tick(&self) -> Option<BroadcastReport> {
        let config = self.config.load();
        if !config.liveness.enabled {
            return None;
        }

        tracing::info!(
            peers = self.switchboard.peer_count(),
            "Liveness check: broadcasting status message"
        );
        let report = self.switchboard.broadcast(&config.liveness.message);
        if !report.evicted.is_empty() {
            tracing::warn!(evicted = report.evicted.len(), "Liveness check evicted dead peers");
        }
        Some(report)
    }

    /// Broadcast now, then once per interval until shutdown.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval_secs = self.config.load().liveness.interval_secs,
            "Liveness broadcaster starting"
        );

        loop {
            self.tick();

            let interval = self.config.load().liveness.interval();
            tokio::select! {
                _ = time::sleep(interval) => {}
                _ = shutdown.recv() => {
                    tracing::info!("Liveness broadcaster received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}
