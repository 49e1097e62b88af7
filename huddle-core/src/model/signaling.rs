use crate::model::ice::{IceCandidate, IceServerConfig};
use crate::model::peer::PeerId;
use crate::model::room::RoomCode;
use serde::{Deserialize, Serialize};

/// Messages a client sends to the relay.
///
/// Addressed variants only name the recipient. The sender is stamped by the
/// relay from the transport identity, so a client has no way to claim one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ClientSignal {
    Join { room: RoomCode },
    Leave,
    Offer { to: PeerId, sdp: String },
    Answer { to: PeerId, sdp: String },
    IceCandidate { to: PeerId, candidate: IceCandidate },
}

/// Messages the relay sends to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum ServerSignal {
    Welcome {
        peer_id: PeerId,
    },
    IceConfig {
        ice_servers: Vec<IceServerConfig>,
    },
    MembershipSnapshot {
        room: RoomCode,
        members: Vec<PeerId>,
    },
    MemberJoined {
        peer_id: PeerId,
    },
    MemberLeft {
        peer_id: PeerId,
    },
    Offer {
        from: PeerId,
        sdp: String,
    },
    Answer {
        from: PeerId,
        sdp: String,
    },
    IceCandidate {
        from: PeerId,
        candidate: IceCandidate,
    },
}

impl ClientSignal {
    /// Recipient of an addressed message, `None` for room-level messages.
    pub fn recipient(&self) -> Option<PeerId> {
        match self {
            ClientSignal::Offer { to, .. }
            | ClientSignal::Answer { to, .. }
            | ClientSignal::IceCandidate { to, .. } => Some(*to),
            ClientSignal::Join { .. } | ClientSignal::Leave => None,
        }
    }

    /// Rewrites an addressed message into its relayed form, stamped with `from`.
    pub fn into_relayed(self, from: PeerId) -> Option<ServerSignal> {
        match self {
            ClientSignal::Offer { sdp, .. } => Some(ServerSignal::Offer { from, sdp }),
            ClientSignal::Answer { sdp, .. } => Some(ServerSignal::Answer { from, sdp }),
            ClientSignal::IceCandidate { candidate, .. } => {
                Some(ServerSignal::IceCandidate { from, candidate })
            }
            ClientSignal::Join { .. } | ClientSignal::Leave => None,
        }
    }
}
