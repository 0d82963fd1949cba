//! Round-trip failures.

use std::time::Duration;

use thiserror::Error;

use crate::bridge::peers::{LinkError, PeerId};

/// Ways a single round trip can fail. None of them affect other round trips.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// No peer was connected at dispatch time.
    #[error("no peer available to handle the request")]
    NoPeerAvailable,

    /// The peer did not answer before the deadline.
    #[error("timed out after {0:?} waiting for peer response")]
    Timeout(Duration),

    /// Writing to the selected peer failed; the peer has been evicted.
    #[error("failed to send request to peer {peer}: {source}")]
    SendFailure {
        peer: PeerId,
        #[source]
        source: LinkError,
    },

    /// The reply slot was dropped without an answer (bridge shutting down).
    #[error("request abandoned before a reply arrived")]
    Abandoned,
}

impl BridgeError {
    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            BridgeError::NoPeerAvailable => "no_peer",
            BridgeError::Timeout(_) => "timeout",
            BridgeError::SendFailure { .. } => "send_failure",
            BridgeError::Abandoned => "abandoned",
        }
    }
}
