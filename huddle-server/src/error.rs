use huddle_core::PeerId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// The recipient has no live transport. Signaling is best-effort, so
    /// callers log this and move on.
    #[error("no connected transport for peer {0}")]
    UnknownTarget(PeerId),

    #[error("failed to encode signal: {0}")]
    Serialize(#[from] serde_json::Error),
}
