//! Client SDK for the trafficker bridge.
//!
//! - [`PeerClient`] connects to `/ws` as a peer and answers bridged requests
//! - [`BridgeClient`] issues HTTP requests through `/api/`

mod client;

pub use client::{BridgeClient, BridgedRequest, PeerClient, PeerConnection, PeerError, RESPONSE_ID_FIELD};
