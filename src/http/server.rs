//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router: `/api/*` bridge handler, `/ws` peer endpoint,
//!   optional `/admin/*`, static fallback
//! - Wire up middleware (request ID, tracing, outer timeout)
//! - Run the liveness broadcaster and apply config reloads
//! - Shut down gracefully, closing peers and releasing waiters

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeFile,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin;
use crate::bridge::{Correlator, InboundRouter, LivenessBroadcaster, RequestEnvelope, Switchboard};
use crate::config::{self, BridgeConfig, SharedConfig};
use crate::http::request::{describe, request_id};
use crate::http::response::reply_response;
use crate::http::websocket::peer_socket_handler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub switchboard: Arc<Switchboard>,
    pub correlator: Correlator,
    pub router: InboundRouter,
    pub config: SharedConfig,
}

impl AppState {
    pub fn new(config: BridgeConfig) -> Self {
        let switchboard = Arc::new(Switchboard::new());
        Self {
            correlator: Correlator::new(switchboard.clone()),
            router: InboundRouter::new(switchboard.clone()),
            switchboard,
            config: config::shared(config),
        }
    }
}

/// HTTP front end of the bridge.
pub struct BridgeServer {
    router: Router,
    state: AppState,
}

impl BridgeServer {
    pub fn new(config: BridgeConfig) -> Self {
        let state = AppState::new(config);
        let router = Self::build_router(state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_router(state: AppState) -> Router {
        let config = state.config.load_full();

        let mut app = Router::new()
            .route("/api/", any(bridge_handler))
            .route("/api/{*path}", any(bridge_handler))
            .route("/ws", get(peer_socket_handler));

        if config.admin.enabled {
            app = app.merge(admin::router(state.clone()));
        }

        app.fallback_service(ServeFile::new(&config.static_files.index_path))
            .with_state(state)
            .layer(TimeoutLayer::new(config.timeouts.request()))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    pub fn switchboard(&self) -> Arc<Switchboard> {
        self.state.switchboard.clone()
    }

    pub fn config(&self) -> SharedConfig {
        self.state.config.clone()
    }

    /// Serve on `listener` until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<BridgeConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let liveness = LivenessBroadcaster::new(self.state.switchboard.clone(), self.state.config.clone());
        tokio::spawn(liveness.run(shutdown.resubscribe()));

        let live_config = self.state.config.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(new_config) => {
                            tracing::info!(
                                round_trip_secs = new_config.timeouts.round_trip_secs,
                                liveness_interval_secs = new_config.liveness.interval_secs,
                                "Applying reloaded configuration"
                            );
                            live_config.store(Arc::new(new_config));
                        }
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        // In-flight bridge requests only finish once their waiters are released.
        let switchboard = self.state.switchboard.clone();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining");
                switchboard.close_all();
            })
            .await?;

        // Peers that connected while draining.
        self.state.switchboard.close_all();
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// `ANY /api/*`: one round trip through a connected peer.
async fn bridge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request_id(request.headers()).to_string();
    let config = state.config.load_full();

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, config.security.max_body_size).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Error reading request body");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read body").into_response();
        }
    };

    let metadata = describe(&parts, &body);
    tracing::debug!(
        request_id = %request_id,
        method = %metadata.method,
        path = %metadata.path,
        "Bridging request"
    );

    match state
        .correlator
        .perform(RequestEnvelope::from(metadata), config.timeouts.round_trip())
        .await
    {
        Ok(reply) => reply_response(reply),
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Round trip failed");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::peers::tests::RecordingLink;
    use std::time::{Duration, Instant};
    use tower::ServiceExt;

    fn test_config() -> BridgeConfig {
        let mut config = BridgeConfig::default();
        config.timeouts.round_trip_secs = 1;
        config.timeouts.request_secs = 5;
        config
    }

    #[tokio::test]
    async fn api_without_peers_is_service_unavailable() {
        let state = AppState::new(test_config());
        let app = BridgeServer::build_router(state);

        let start = Instant::now();
        let response = app
            .oneshot(Request::builder().uri("/api/anything").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn silent_peer_is_gateway_timeout() {
        let state = AppState::new(test_config());
        let link = Arc::new(RecordingLink::default());
        state.switchboard.register_peer(link.clone());
        let app = BridgeServer::build_router(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/slow")
                    .body(Body::from("payload"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(link.messages().len(), 1);
        assert_eq!(state.switchboard.pending_count(), 0);
    }

    #[tokio::test]
    async fn admin_routes_absent_when_disabled() {
        let mut config = test_config();
        config.static_files.index_path = "does-not-exist.html".to_string();
        let state = AppState::new(config);
        let app = BridgeServer::build_router(state);

        let response = app
            .oneshot(Request::builder().uri("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
