//! Inbound message routing.
//!
//! Every frame a peer sends goes through `InboundRouter::on_message`, which
//! runs on that peer's read loop. Frames that are not routable replies
//! (the echoed liveness sentinel, garbage, replies nobody is waiting for)
//! are logged and dropped. Nothing here surfaces an error: no caller is
//! waiting on a malformed message.

use std::sync::Arc;

use crate::bridge::envelope::ReplyEnvelope;
use crate::bridge::peers::PeerId;
use crate::bridge::switchboard::Switchboard;
use crate::observability::metrics;

/// What happened to an inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    /// Handed to the waiting round trip.
    Delivered,
    /// Well formed, but no round trip is waiting for that id.
    Unmatched,
    /// No usable `ResponseID`.
    Malformed,
}

#[derive(Debug, Clone)]
pub struct InboundRouter {
    switchboard: Arc<Switchboard>,
}

impl InboundRouter {
    pub fn new(switchboard: Arc<Switchboard>) -> Self {
        Self { switchboard }
    }

    pub fn on_message(&self, peer_id: PeerId, raw: &[u8]) -> RouteOutcome {
        let reply = match ReplyEnvelope::parse(raw) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::debug!(
                    peer_id = %peer_id,
                    error = %e,
                    payload = %String::from_utf8_lossy(raw),
                    "Discarding unroutable message"
                );
                metrics::record_discarded_reply("malformed");
                return RouteOutcome::Malformed;
            }
        };

        let response_id = reply.response_id().clone();
        if self.switchboard.deliver(reply) {
            tracing::debug!(peer_id = %peer_id, response_id = %response_id, "Reply delivered");
            RouteOutcome::Delivered
        } else {
            tracing::debug!(
                peer_id = %peer_id,
                response_id = %response_id,
                "No pending request for reply, discarding"
            );
            metrics::record_discarded_reply("unmatched");
            RouteOutcome::Unmatched
        }
    }
}
