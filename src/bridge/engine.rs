//! Correlation engine.
//!
//! # Responsibilities
//! - Run one request/reply round trip against a connected peer
//! - Enforce the caller's deadline
//! - Guarantee the pending entry is gone on every exit path
//!
//! # Flow
//! ```text
//! select peer ──none──▶ NoPeerAvailable
//!     │
//! open pending entry, stamp ResponseID
//!     │
//! send ──err──▶ cancel entry, evict peer, SendFailure
//!     │
//! wait on slot ──deadline──▶ cancel entry ──already gone──▶ reply won, return it
//!     │                           │
//!   reply                      Timeout
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time;

use crate::bridge::envelope::{ReplyEnvelope, RequestEnvelope, ResponseId};
use crate::bridge::error::BridgeError;
use crate::bridge::pending::ReplySlot;
use crate::bridge::switchboard::Switchboard;
use crate::observability::metrics;

/// Removes a pending entry when dropped.
///
/// Covers the timeout path as well as a caller whose future is dropped
/// mid-wait (e.g. the HTTP client disconnected). Removal is idempotent, so
/// dropping after a successful delivery is a no-op.
struct PendingGuard<'a> {
    switchboard: &'a Switchboard,
    id: ResponseId,
}

impl PendingGuard<'_> {
    /// Remove the entry now. Returns whether this call removed it.
    fn cancel(&self) -> bool {
        self.switchboard.cancel_request(&self.id)
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.switchboard.cancel_request(&self.id);
    }
}

/// Drives round trips over the switchboard.
#[derive(Debug, Clone)]
pub struct Correlator {
    switchboard: Arc<Switchboard>,
}

impl Correlator {
    pub fn new(switchboard: Arc<Switchboard>) -> Self {
        Self { switchboard }
    }

    /// Send `envelope` to a connected peer and wait up to `deadline` for
    /// its reply.
    pub async fn perform(
        &self,
        envelope: RequestEnvelope,
        deadline: Duration,
    ) -> Result<ReplyEnvelope, BridgeError> {
        let start = Instant::now();
        let result = self.round_trip(envelope, deadline).await;

        let outcome = match &result {
            Ok(_) => "ok",
            Err(e) => e.kind(),
        };
        metrics::record_round_trip(outcome, start);

        result
    }

    async fn round_trip(
        &self,
        envelope: RequestEnvelope,
        deadline: Duration,
    ) -> Result<ReplyEnvelope, BridgeError> {
        // 1. Pick a peer; fail fast if there is none
        let peer = self
            .switchboard
            .select_peer()
            .ok_or(BridgeError::NoPeerAvailable)?;

        // 2. Open the pending entry and stamp the envelope
        let (response_id, mut slot) = self.switchboard.open_request();
        let guard = PendingGuard {
            switchboard: &self.switchboard,
            id: response_id.clone(),
        };
        let message = envelope.stamped(&response_id);

        // 3. Dispatch
        if let Err(source) = peer.send(&message) {
            guard.cancel();
            self.switchboard.evict_peer(&peer.id());
            return Err(BridgeError::SendFailure {
                peer: peer.id(),
                source,
            });
        }

        tracing::debug!(
            peer_id = %peer.id(),
            response_id = %response_id,
            "Request dispatched, awaiting reply"
        );

        // 4. Wait without holding the lock
        match time::timeout(deadline, &mut slot).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) => Err(BridgeError::Abandoned),
            Err(_) => {
                let outcome = settle_expired(&guard, &mut slot, deadline);
                if matches!(outcome, Err(BridgeError::Timeout(_))) {
                    tracing::warn!(
                        peer_id = %peer.id(),
                        response_id = %response_id,
                        deadline = ?deadline,
                        "Timed out waiting for peer reply"
                    );
                }
                outcome
            }
        }
    }
}

/// Resolve a round trip whose deadline has fired. If the cancel finds the
/// entry already gone, a reply was delivered in between and sits in the slot.
fn settle_expired(
    guard: &PendingGuard<'_>,
    slot: &mut ReplySlot,
    deadline: Duration,
) -> Result<ReplyEnvelope, BridgeError> {
    if guard.cancel() {
        Err(BridgeError::Timeout(deadline))
    } else {
        slot.try_recv().map_err(|_| BridgeError::Abandoned)
    }
}
