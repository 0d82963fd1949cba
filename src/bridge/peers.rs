//! Peer registry.
//!
//! # Responsibilities
//! - Assign each connected peer a unique identifier
//! - Pick a peer to carry a round trip
//! - Broadcast to every peer, evicting the ones whose link has failed
//!
//! # Design Decisions
//! - The registry is a plain map; locking belongs to the `Switchboard`
//! - Selection is "first found": no balancing, no affinity
//! - A failed send is treated as a dead peer, never retried

use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;

use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for a connected peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(Uuid);

impl PeerId {
    /// Generate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PeerId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised when writing to a peer link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The connection's writer has gone away.
    #[error("peer link closed")]
    Closed,

    /// The outbound queue is full; the peer is not draining it.
    #[error("peer outbound queue saturated")]
    Saturated,
}

/// The sending half of a peer connection.
///
/// Implementations must not block: `send` enqueues or fails immediately,
/// since it is called while the switchboard lock is held.
pub trait PeerLink: Send + Sync + fmt::Debug {
    /// Queue a text message for the peer.
    fn send(&self, message: &str) -> Result<(), LinkError>;

    /// Ask the connection to close. Best effort.
    fn close(&self);

    /// Remote address, if the transport knows it.
    fn remote_addr(&self) -> Option<SocketAddr> {
        None
    }
}

/// A registered peer.
#[derive(Debug, Clone)]
pub struct Peer {
    id: PeerId,
    link: Arc<dyn PeerLink>,
    connected_at: SystemTime,
}

impl Peer {
    pub fn id(&self) -> PeerId {
        self.id
    }

    pub fn connected_at(&self) -> SystemTime {
        self.connected_at
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.link.remote_addr()
    }

    /// Send a text message over this peer's link.
    pub fn send(&self, message: &str) -> Result<(), LinkError> {
        self.link.send(message)
    }

    pub(crate) fn close(&self) {
        self.link.close();
    }
}

/// Result of a broadcast pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Peers the message was queued for.
    pub delivered: usize,
    /// Peers removed because their send failed.
    pub evicted: Vec<PeerId>,
}

/// Map of connected peers.
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: HashMap<PeerId, Peer>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new peer and return its freshly assigned identifier.
    pub fn register(&mut self, link: Arc<dyn PeerLink>) -> PeerId {
        let mut id = PeerId::new();
        while self.peers.contains_key(&id) {
            id = PeerId::new();
        }

        self.peers.insert(
            id,
            Peer {
                id,
                link,
                connected_at: SystemTime::now(),
            },
        );
        id
    }

    /// Remove a peer. Returns it if it was present.
    pub fn unregister(&mut self, id: &PeerId) -> Option<Peer> {
        self.peers.remove(id)
    }

    /// Any connected peer, or `None` when empty.
    pub fn select_one(&self) -> Option<Peer> {
        self.peers.values().next().cloned()
    }

    /// Send `message` to every peer. Peers whose send fails are removed and
    /// their link closed; the rest still receive the message.
    pub fn broadcast(&mut self, message: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for (id, peer) in &self.peers {
            match peer.send(message) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::warn!(peer_id = %id, error = %e, "Broadcast send failed, evicting peer");
                    report.evicted.push(*id);
                }
            }
        }

        for id in &report.evicted {
            if let Some(peer) = self.peers.remove(id) {
                peer.close();
            }
        }

        report
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Snapshot of every registered peer.
    pub fn peers(&self) -> Vec<Peer> {
        self.peers.values().cloned().collect()
    }

    /// Remove every peer, returning them.
    pub fn drain(&mut self) -> Vec<Peer> {
        self.peers.drain().map(|(_, peer)| peer).collect()
    }
}
