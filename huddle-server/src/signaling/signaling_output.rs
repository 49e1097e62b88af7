use crate::error::RelayError;
use huddle_core::{PeerId, ServerSignal};
use async_trait::async_trait;

/// Whatever reaches connected clients. The relay only talks to this trait,
/// so tests can capture traffic without sockets.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver one signal to a connected peer. Fails with
    /// [`RelayError::UnknownTarget`] when the peer has no live transport.
    async fn send_signal(&self, peer_id: PeerId, signal: ServerSignal) -> Result<(), RelayError>;
}
