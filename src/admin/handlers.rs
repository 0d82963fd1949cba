use std::time::UNIX_EPOCH;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::http::server::AppState;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub connected_peers: usize,
    pub pending_requests: usize,
}

#[derive(Debug, Serialize)]
pub struct PeerStatus {
    pub id: String,
    /// Seconds since the Unix epoch.
    pub connected_at: u64,
    pub remote: Option<String>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        connected_peers: state.switchboard.peer_count(),
        pending_requests: state.switchboard.pending_count(),
    })
}

pub async fn get_peers(State(state): State<AppState>) -> Json<Vec<PeerStatus>> {
    let peers = state
        .switchboard
        .peers()
        .into_iter()
        .map(|peer| PeerStatus {
            id: peer.id().to_string(),
            connected_at: peer
                .connected_at()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            remote: peer.remote_addr().map(|a| a.to_string()),
        })
        .collect();

    Json(peers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::peers::tests::RecordingLink;
    use crate::config::BridgeConfig;
    use crate::http::server::BridgeServer;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn admin_state() -> AppState {
        let mut config = BridgeConfig::default();
        config.admin.enabled = true;
        config.admin.api_key = "s3cret".to_string();
        AppState::new(config)
    }

    #[tokio::test]
    async fn status_requires_bearer_token() {
        let app = BridgeServer::build_router(admin_state());

        let response = app
            .oneshot(Request::builder().uri("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn status_reports_counts() {
        let state = admin_state();
        state.switchboard.register_peer(Arc::new(RecordingLink::default()));
        let app = BridgeServer::build_router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/status")
                    .header(header::AUTHORIZATION, "Bearer s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let status: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(status["status"], "operational");
        assert_eq!(status["connected_peers"], 1);
        assert_eq!(status["pending_requests"], 0);
    }

    #[tokio::test]
    async fn peers_lists_registered_ids() {
        let state = admin_state();
        let id = state.switchboard.register_peer(Arc::new(RecordingLink::default()));

        let Json(peers) = get_peers(State(state)).await;

        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].id, id.to_string());
        assert!(peers[0].connected_at > 0);
    }
}
