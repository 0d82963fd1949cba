//! Admin API.
//!
//! Read-only introspection of the bridge, mounted under `/admin` when
//! `admin.enabled` is set. Every route requires `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::{get_peers, get_status};
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/peers", get(get_peers))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
