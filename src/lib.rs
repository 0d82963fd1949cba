//! HTTP to WebSocket request/reply bridge.
//!
//! HTTP requests under `/api/` are wrapped in a JSON envelope, stamped with
//! a fresh `ResponseID` and pushed to one connected WebSocket peer. The
//! first peer message carrying that ID completes the HTTP response.

pub mod admin;
pub mod bridge;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;

pub use config::schema::BridgeConfig;
pub use http::BridgeServer;
pub use lifecycle::Shutdown;
