use std::fmt;

/// Offer/answer progress of one pair, as seen by the local side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationState {
    Idle,
    HaveLocalOffer,
    HaveRemoteOffer,
    Stable,
    /// Terminal until the pair is recreated.
    Closed,
}

impl NegotiationState {
    /// A fresh local offer needs no rollback from here.
    pub fn can_offer(self) -> bool {
        matches!(self, NegotiationState::Idle | NegotiationState::Stable)
    }
}

impl fmt::Display for NegotiationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationState::Idle => "idle",
            NegotiationState::HaveLocalOffer => "have-local-offer",
            NegotiationState::HaveRemoteOffer => "have-remote-offer",
            NegotiationState::Stable => "stable",
            NegotiationState::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sends the first offer.
    Initiator,
    Responder,
}

/// What the session reports for one remote participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerStatus {
    Negotiating,
    Connected,
    Stalled,
    Failed,
    Closed,
}
