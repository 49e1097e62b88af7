use huddle_core::{PeerId, ServerSignal};

/// Room-wide notification about one member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipEvent {
    Joined(PeerId),
    Left(PeerId),
}

impl MembershipEvent {
    pub fn subject(&self) -> PeerId {
        match self {
            MembershipEvent::Joined(id) | MembershipEvent::Left(id) => *id,
        }
    }

    pub fn to_signal(self) -> ServerSignal {
        match self {
            MembershipEvent::Joined(peer_id) => ServerSignal::MemberJoined { peer_id },
            MembershipEvent::Left(peer_id) => ServerSignal::MemberLeft { peer_id },
        }
    }
}
