use crate::error::MediaError;
use crate::link::LinkConnectionState;
use crate::negotiation::{NegotiationState, PeerStatus, Role};
use huddle_core::{PeerId, RoomCode};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerSnapshot {
    pub status: PeerStatus,
    pub state: NegotiationState,
    pub role: Role,
    pub media_received: bool,
    pub retry_count: u32,
    pub connection: LinkConnectionState,
}

/// Aggregate view published by the session after every handled event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStatus {
    pub local_id: Option<PeerId>,
    pub room: Option<RoomCode>,
    /// Set when local capture failed; the session is over.
    pub local_media_error: Option<MediaError>,
    pub peers: BTreeMap<PeerId, PeerSnapshot>,
    /// `false` once the session loop has exited.
    pub running: bool,
}

impl SessionStatus {
    pub fn peer(&self, remote: &PeerId) -> Option<&PeerSnapshot> {
        self.peers.get(remote)
    }

    pub fn peer_status(&self, remote: &PeerId) -> Option<PeerStatus> {
        self.peer(remote).map(|p| p.status)
    }
}
