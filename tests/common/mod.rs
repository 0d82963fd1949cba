//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use trafficker::bridge::Switchboard;
use trafficker::config::BridgeConfig;
use trafficker::{BridgeServer, Shutdown};
use trafficker_peer::{BridgedRequest, PeerClient, PeerConnection};

/// A bridge running on an ephemeral port.
pub struct TestBridge {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub switchboard: Arc<Switchboard>,
    pub server: JoinHandle<()>,
}

impl TestBridge {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Config with short timeouts and liveness off unless a test turns it on.
pub fn test_config() -> BridgeConfig {
    let mut config = BridgeConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.timeouts.round_trip_secs = 1;
    config.timeouts.request_secs = 5;
    config.liveness.enabled = false;
    config.observability.metrics_enabled = false;
    config
}

pub async fn start_bridge(config: BridgeConfig) -> TestBridge {
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = BridgeServer::new(config);
    let switchboard = server.switchboard();
    let server_shutdown = shutdown.subscribe();

    let server = tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    TestBridge {
        addr,
        shutdown,
        switchboard,
        server,
    }
}

/// Connect a raw peer and wait until the bridge has registered it.
pub async fn connect_peer(bridge: &TestBridge) -> PeerConnection {
    let before = bridge.switchboard.peer_count();
    let connection = PeerClient::new(bridge.ws_url()).connect().await.unwrap();
    wait_for_peers(&bridge.switchboard, before + 1).await;
    connection
}

/// Spawn a peer that answers with `handler`.
pub async fn spawn_peer<F, Fut>(bridge: &TestBridge, handler: F) -> JoinHandle<()>
where
    F: Fn(BridgedRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Option<Value>> + Send + 'static,
{
    let connection = connect_peer(bridge).await;
    tokio::spawn(async move {
        let _ = connection.serve(handler).await;
    })
}

/// Spawn a peer that echoes every request back.
pub async fn spawn_echo_peer(bridge: &TestBridge) -> JoinHandle<()> {
    spawn_peer(bridge, |request| async move { serde_json::to_value(&request).ok() }).await
}

pub async fn wait_for_peers(switchboard: &Switchboard, expected: usize) {
    wait_until(|| switchboard.peer_count() == expected).await;
}

/// Poll `condition` for up to two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}

pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
