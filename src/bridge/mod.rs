//! Request/reply correlation over peer connections.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → engine.rs (select peer, open pending entry, stamp ResponseID)
//!     → peers.rs (PeerLink::send to the chosen peer)
//!     ... peer works ...
//! peer frame
//!     → router.rs (parse ResponseID)
//!     → pending.rs (deliver into the waiting slot)
//!     → engine.rs wakes up and returns the reply
//!
//! liveness.rs: every interval → peers.rs broadcast → evict dead peers
//! ```
//!
//! # Design Decisions
//! - Registry and pending table share one lock (switchboard.rs)
//! - The lock is never held while waiting for a reply
//! - Delivery and timeout race under the lock; exactly one wins
//! - No retries: a failed round trip is reported to the caller as is

pub mod engine;
pub mod envelope;
pub mod error;
pub mod liveness;
pub mod peers;
pub mod pending;
pub mod router;
pub mod switchboard;

pub use engine::Correlator;
pub use envelope::{ReplyEnvelope, RequestEnvelope, RequestMetadata, ResponseId, RESPONSE_ID_FIELD};
pub use error::BridgeError;
pub use liveness::LivenessBroadcaster;
pub use peers::{LinkError, Peer, PeerId, PeerLink};
pub use router::{InboundRouter, RouteOutcome};
pub use switchboard::Switchboard;
