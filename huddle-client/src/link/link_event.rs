use crate::media::TrackKind;
use huddle_core::{IceCandidate, PeerId};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkConnectionState {
    New,
    Connecting,
    Connected,
    Disconnected,
    Failed,
    Closed,
}

/// Callback-side happenings of a peer link, turned into values so the
/// owning state machine handles them in order with everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkEvent {
    CandidateGenerated(IceCandidate),
    Track(TrackKind),
    ConnectionStateChanged(LinkConnectionState),
    RenegotiationNeeded,
}

/// A [`LinkEvent`] tagged with the link that produced it.
#[derive(Debug, Clone)]
pub struct LinkEnvelope {
    pub remote: PeerId,
    /// Links replaced by recovery keep emitting for a while; their events
    /// carry an old generation and get dropped.
    pub generation: u64,
    pub event: LinkEvent,
}

/// Handed to a peer link at creation; the link reports everything through it.
#[derive(Debug, Clone)]
pub struct LinkEventSender {
    remote: PeerId,
    generation: u64,
    tx: mpsc::UnboundedSender<LinkEnvelope>,
}

impl LinkEventSender {
    pub fn new(remote: PeerId, generation: u64, tx: mpsc::UnboundedSender<LinkEnvelope>) -> Self {
        Self {
            remote,
            generation,
            tx,
        }
    }

    pub fn remote(&self) -> PeerId {
        self.remote
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the session stopped listening.
    pub fn emit(&self, event: LinkEvent) -> bool {
        self.tx
            .send(LinkEnvelope {
                remote: self.remote,
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}
