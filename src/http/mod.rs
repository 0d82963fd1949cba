//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! HTTP client
//!     → server.rs (Axum setup, request ID, tracing, outer timeout)
//!     → request.rs (flatten method/path/headers/body into metadata)
//!     → bridge::Correlator (one round trip through a peer)
//!     → response.rs (reply JSON or gateway error status)
//!     → HTTP client
//!
//! Peer
//!     → websocket.rs (/ws upgrade, register, read loop)
//!     → bridge::InboundRouter
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::X_REQUEST_ID;
pub use server::{AppState, BridgeServer};
