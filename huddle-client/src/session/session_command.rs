use huddle_core::{PeerId, RoomCode};

/// User actions fed into the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Join(RoomCode),
    /// Closes every pair and leaves the room.
    Leave,
    Retry(PeerId),
    Shutdown,
}
