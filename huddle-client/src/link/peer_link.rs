use crate::error::LinkError;
use crate::link::LinkEventSender;
use crate::media::{LocalTrack, TrackKind};
use async_trait::async_trait;
use huddle_core::{IceCandidate, IceServerConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpKind {
    Offer,
    Answer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription {
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One connection to one remote participant.
///
/// Description methods fail with [`LinkError::InvalidState`] when the
/// description does not fit the current signaling state.
#[async_trait]
pub trait PeerLink: Send + Sync {
    async fn create_offer(&self) -> Result<SessionDescription, LinkError>;

    async fn create_answer(&self) -> Result<SessionDescription, LinkError>;

    async fn set_local_description(&self, desc: SessionDescription) -> Result<(), LinkError>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<(), LinkError>;

    /// Reverts a pending description and returns the link to stable.
    async fn rollback(&self) -> Result<(), LinkError>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<(), LinkError>;

    async fn add_track(&self, track: &LocalTrack) -> Result<(), LinkError>;

    /// Whether a sender of this kind is already attached.
    async fn has_sender(&self, kind: TrackKind) -> bool;

    async fn local_description(&self) -> Option<SessionDescription>;

    async fn remote_description(&self) -> Option<SessionDescription>;

    async fn close(&self) -> Result<(), LinkError>;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkConfig {
    pub ice_servers: Vec<IceServerConfig>,
}

#[async_trait]
pub trait PeerLinkFactory: Send + Sync {
    async fn create(
        &self,
        config: &LinkConfig,
        events: LinkEventSender,
    ) -> Result<Box<dyn PeerLink>, LinkError>;
}
