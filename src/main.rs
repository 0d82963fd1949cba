//! trafficker: HTTP to WebSocket request/reply bridge.
//!
//! # Architecture Overview
//!
//! ```text
//!   HTTP client                        trafficker                          WebSocket peers
//!  ─────────────┐   ┌──────────────────────────────────────────────┐   ┌───────────────
//!  ANY /api/*  ─┼──▶│ http::server ──▶ bridge::Correlator          │   │
//!               │   │                    │ select peer, stamp ID   │   │
//!               │   │                    ▼                         │   │
//!               │   │              bridge::Switchboard ──send────▶─┼──▶│ peer
//!               │   │              (peers + pending table)         │   │
//!  reply JSON ◀─┼───│ ◀── oneshot ◀── bridge::InboundRouter ◀──────┼───│ reply {ResponseID}
//!               │   │                                              │   │
//!               │   │ bridge::LivenessBroadcaster ──"Status check!"┼──▶│ all peers
//!               │   └──────────────────────────────────────────────┘   │
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use trafficker::config::{load_config, BridgeConfig, ConfigWatcher};
use trafficker::lifecycle::{signals::spawn_signal_handler, Shutdown};
use trafficker::observability::{logging::init_logging, metrics::init_metrics};
use trafficker::BridgeServer;

#[derive(Parser, Debug)]
#[command(author, version, about = "HTTP to WebSocket request/reply bridge")]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => BridgeConfig::default(),
    };

    init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "trafficker starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        round_trip_secs = config.timeouts.round_trip_secs,
        liveness_interval_secs = config.liveness.interval_secs,
        admin_enabled = config.admin.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    // The watcher handle must outlive the server.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_tx, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let server = BridgeServer::new(config);
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
