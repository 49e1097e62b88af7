use huddle_core::PeerId;
use thiserror::Error;

/// Failures reported by a peer link.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The description does not fit the link's current signaling state.
    #[error("invalid signaling state: {0}")]
    InvalidState(String),

    #[error("peer link rejected the operation: {0}")]
    Rejected(String),

    #[error("peer link is closed")]
    Closed,
}

/// Local capture could not start. Fatal for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("permission to use local media was denied")]
    PermissionDenied,

    #[error("no usable local media device")]
    DeviceUnavailable,
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error(transparent)]
    Link(#[from] LinkError),

    #[error("could not create a peer link: {0}")]
    LinkCreation(#[source] LinkError),

    /// The pair has no live link.
    #[error("negotiation with {0} is closed")]
    Closed(PeerId),
}

/// The session loop has stopped and no longer takes commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("session has stopped")]
pub struct SessionStopped;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to reach relay: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
}
