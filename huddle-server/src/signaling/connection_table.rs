use crate::error::RelayError;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use huddle_core::{PeerId, ServerSignal};
use tokio::sync::mpsc;
use tracing::error;

/// Live WebSocket writers, keyed by the peer id assigned on connect.
#[derive(Default)]
pub struct ConnectionTable {
    peers: DashMap<PeerId, mpsc::UnboundedSender<Message>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        self.peers.insert(peer_id, tx);
    }

    pub fn unregister(&self, peer_id: &PeerId) {
        self.peers.remove(peer_id);
    }
}

#[async_trait]
impl SignalingOutput for ConnectionTable {
    async fn send_signal(&self, peer_id: PeerId, signal: ServerSignal) -> Result<(), RelayError> {
        let json = serde_json::to_string(&signal)?;

        let Some(peer) = self.peers.get(&peer_id) else {
            return Err(RelayError::UnknownTarget(peer_id));
        };

        if let Err(e) = peer.send(Message::Text(json.into())) {
            // Writer task already gone, the socket is closing.
            error!("Failed to send WS message to {}: {:?}", peer_id, e);
            return Err(RelayError::UnknownTarget(peer_id));
        }
        Ok(())
    }
}
