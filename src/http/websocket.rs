//! Peer WebSocket endpoint.
//!
//! # Responsibilities
//! - Accept the upgrade on `/ws` and register the connection as a peer
//! - Drain the peer's outbound queue into the socket (writer task)
//! - Feed every inbound frame to the router (read loop)
//! - Unregister the peer when the read loop ends or the link is closed
//!
//! # Data Flow
//! ```text
//! Switchboard ──PeerLink::send──▶ bounded queue ──writer task──▶ socket ──▶ peer
//! peer ──▶ socket ──read loop──▶ InboundRouter::on_message
//! ```
//!
//! # Design Decisions
//! - Sends never block: a full or closed queue is reported as a link error
//!   and the caller evicts the peer
//! - Ping/pong is answered by axum
//! - Text and binary frames are both routed

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::watch;
use tokio::time;

use crate::bridge::{LinkError, PeerLink};
use crate::http::server::AppState;

/// Outbound frames buffered per peer before sends start failing.
pub const PEER_QUEUE_DEPTH: usize = 64;

/// How long the writer may take to flush the Close frame on teardown.
const WRITER_GRACE: Duration = Duration::from_secs(1);

/// `PeerLink` backed by a WebSocket writer task.
///
/// Closing goes through a `watch` flag rather than the queue, so a peer
/// evicted for a full queue is still torn down.
#[derive(Debug)]
struct SocketLink {
    outbound: mpsc::Sender<Message>,
    closing: watch::Sender<bool>,
    remote: SocketAddr,
}

impl SocketLink {
    fn new(remote: SocketAddr) -> (Self, mpsc::Receiver<Message>, watch::Receiver<bool>) {
        let (outbound, outbound_rx) = mpsc::channel(PEER_QUEUE_DEPTH);
        let (closing, closing_rx) = watch::channel(false);
        let link = Self {
            outbound,
            closing,
            remote,
        };
        (link, outbound_rx, closing_rx)
    }
}

impl PeerLink for SocketLink {
    fn send(&self, message: &str) -> Result<(), LinkError> {
        if *self.closing.borrow() {
            return Err(LinkError::Closed);
        }
        self.outbound
            .try_send(Message::Text(message.to_owned().into()))
            .map_err(|e| match e {
                TrySendError::Full(_) => LinkError::Saturated,
                TrySendError::Closed(_) => LinkError::Closed,
            })
    }

    fn close(&self) {
        self.closing.send_replace(true);
    }

    fn remote_addr(&self) -> Option<SocketAddr> {
        Some(self.remote)
    }
}

/// Resolve once `close` has been called on the link.
async fn closed(closing: &mut watch::Receiver<bool>) {
    // An error means the link itself was dropped, which is a close too.
    let _ = closing.wait_for(|closing| *closing).await;
}

/// `GET /ws`: upgrade and serve a peer.
pub async fn peer_socket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| serve_peer(socket, remote, state))
}

async fn serve_peer(socket: WebSocket, remote: SocketAddr, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (link, mut outbound_rx, closing_rx) = SocketLink::new(remote);
    let link = Arc::new(link);

    let peer_id = state.switchboard.register_peer(link.clone());
    tracing::debug!(peer_id = %peer_id, remote = %remote, "Peer socket upgraded");

    let mut writer_closing = closing_rx.clone();
    let mut writer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = closed(&mut writer_closing) => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                next = outbound_rx.recv() => {
                    let Some(message) = next else { break };
                    if let Err(e) = sink.send(message).await {
                        tracing::debug!(peer_id = %peer_id, error = %e, "Peer write failed");
                        break;
                    }
                }
            }
        }
        // Dropping the receiver makes further sends fail with `Closed`.
    });

    let mut reader_closing = closing_rx;
    loop {
        tokio::select! {
            _ = closed(&mut reader_closing) => {
                tracing::debug!(peer_id = %peer_id, "Closing evicted peer");
                break;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    state.router.on_message(peer_id, text.as_str().as_bytes());
                }
                Some(Ok(Message::Binary(data))) => {
                    state.router.on_message(peer_id, &data);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(peer_id = %peer_id, error = %e, "Error reading from peer");
                    break;
                }
            },
        }
    }

    state.switchboard.unregister_peer(&peer_id);
    link.close();
    if time::timeout(WRITER_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{BridgeError, Correlator, RequestEnvelope, Switchboard};
    use axum::http::StatusCode;

    fn remote() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn saturated_link_still_signals_close() {
        let (link, mut outbound_rx, mut closing_rx) = SocketLink::new(remote());

        for _ in 0..PEER_QUEUE_DEPTH {
            link.send("backlog").unwrap();
        }
        assert_eq!(link.send("one too many"), Err(LinkError::Saturated));

        link.close();

        time::timeout(Duration::from_secs(1), closed(&mut closing_rx))
            .await
            .expect("close signal lost behind a full queue");
        assert_eq!(link.send("after close"), Err(LinkError::Closed));

        let mut drained = 0;
        while outbound_rx.try_recv().is_ok() {
            drained += 1;
        }
        assert_eq!(drained, PEER_QUEUE_DEPTH);
    }

    #[tokio::test]
    async fn dropped_link_counts_as_closed() {
        let (link, _outbound_rx, mut closing_rx) = SocketLink::new(remote());
        drop(link);

        time::timeout(Duration::from_secs(1), closed(&mut closing_rx))
            .await
            .expect("dropped link not observed");
    }

    #[tokio::test]
    async fn saturated_peer_is_evicted_closed_and_answered_with_bad_gateway() {
        let board = Arc::new(Switchboard::new());
        let (link, _outbound_rx, mut closing_rx) = SocketLink::new(remote());
        let link = Arc::new(link);
        for _ in 0..PEER_QUEUE_DEPTH {
            link.send("backlog").unwrap();
        }
        let peer_id = board.register_peer(link.clone());

        let err = Correlator::new(board.clone())
            .perform(RequestEnvelope::default(), Duration::from_secs(5))
            .await
            .unwrap_err();

        match &err {
            BridgeError::SendFailure { peer, source } => {
                assert_eq!(*peer, peer_id);
                assert_eq!(*source, LinkError::Saturated);
            }
            other => panic!("expected send failure, got {:?}", other),
        }
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(board.peer_count(), 0);
        assert_eq!(board.pending_count(), 0);

        time::timeout(Duration::from_secs(1), closed(&mut closing_rx))
            .await
            .expect("evicted peer was not closed");
    }
}
