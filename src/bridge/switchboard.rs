//! Shared bridge state.
//!
//! # Responsibilities
//! - Own the peer registry and the pending request table
//! - Serialize every mutation of either map behind one lock
//! - Keep the peer/pending gauges current
//!
//! # Design Decisions
//! - One coarse `std::sync::Mutex`: operations are short map edits and
//!   non-blocking queue pushes, so the lock is never held across `.await`
//! - Passed around as `Arc<Switchboard>`; there is no global state
//! - A poisoned lock is recovered rather than propagated, since every
//!   critical section leaves both maps consistent

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bridge::envelope::{ReplyEnvelope, ResponseId};
use crate::bridge::peers::{BroadcastReport, Peer, PeerId, PeerLink, PeerRegistry};
use crate::bridge::pending::{PendingTable, ReplySlot};
use crate::observability::metrics;

#[derive(Debug, Default)]
struct BoardState {
    peers: PeerRegistry,
    pending: PendingTable,
}

/// The bridge's shared state.
#[derive(Debug, Default)]
pub struct Switchboard {
    state: Mutex<BoardState>,
}

impl Switchboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- Peers ---

    /// Register a newly connected peer.
    pub fn register_peer(&self, link: Arc<dyn PeerLink>) -> PeerId {
        let mut state = self.lock();
        let id = state.peers.register(link);
        metrics::set_connected_peers(state.peers.len());
        tracing::info!(peer_id = %id, peers = state.peers.len(), "Peer connected");
        id
    }

    /// Forget a peer. Idempotent.
    pub fn unregister_peer(&self, id: &PeerId) -> bool {
        let mut state = self.lock();
        let removed = state.peers.unregister(id).is_some();
        if removed {
            metrics::set_connected_peers(state.peers.len());
            tracing::info!(peer_id = %id, peers = state.peers.len(), "Peer disconnected");
        }
        removed
    }

    /// Remove a peer presumed dead and close its link.
    pub fn evict_peer(&self, id: &PeerId) -> bool {
        let mut state = self.lock();
        match state.peers.unregister(id) {
            Some(peer) => {
                peer.close();
                metrics::set_connected_peers(state.peers.len());
                metrics::record_peer_evictions(1);
                tracing::warn!(peer_id = %id, "Peer evicted");
                true
            }
            None => false,
        }
    }

    /// Pick any connected peer.
    pub fn select_peer(&self) -> Option<Peer> {
        self.lock().peers.select_one()
    }

    /// Send `message` to every peer, evicting those whose link fails.
    pub fn broadcast(&self, message: &str) -> BroadcastReport {
        let mut state = self.lock();
        let report = state.peers.broadcast(message);
        if !report.evicted.is_empty() {
            metrics::record_peer_evictions(report.evicted.len());
            metrics::set_connected_peers(state.peers.len());
        }
        report
    }

    pub fn peer_count(&self) -> usize {
        self.lock().peers.len()
    }

    pub fn peers(&self) -> Vec<Peer> {
        self.lock().peers.peers()
    }

    // --- Pending requests ---

    /// Open a pending entry and return its id and reply slot.
    pub fn open_request(&self) -> (ResponseId, ReplySlot) {
        let mut state = self.lock();
        let opened = state.pending.create();
        metrics::set_pending_requests(state.pending.len());
        opened
    }

    /// Complete the matching pending entry with `reply`.
    /// Returns false if no entry is waiting for it.
    pub fn deliver(&self, reply: ReplyEnvelope) -> bool {
        let mut state = self.lock();
        let id = reply.response_id().clone();
        let delivered = state.pending.deliver(&id, reply);
        if delivered {
            metrics::set_pending_requests(state.pending.len());
        }
        delivered
    }

    /// Drop a pending entry without delivering. Returns whether this call
    /// removed it, i.e. whether no reply had completed it yet.
    pub fn cancel_request(&self, id: &ResponseId) -> bool {
        let mut state = self.lock();
        let removed = state.pending.remove(id);
        if removed {
            metrics::set_pending_requests(state.pending.len());
        }
        removed
    }

    pub fn is_pending(&self, id: &ResponseId) -> bool {
        self.lock().pending.contains(id)
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    // --- Lifecycle ---

    /// Close every peer link and release every waiter.
    pub fn close_all(&self) {
        let mut state = self.lock();
        let peers = state.peers.drain();
        for peer in &peers {
            peer.close();
        }
        let abandoned = state.pending.clear();

        metrics::set_connected_peers(0);
        metrics::set_pending_requests(0);
        tracing::info!(peers = peers.len(), abandoned, "Switchboard closed");
    }
}
