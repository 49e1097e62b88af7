use crate::error::SessionStopped;
use crate::session::{SessionCommand, SessionStatus};
use huddle_core::{PeerId, RoomCode};
use tokio::sync::{mpsc, watch};

/// Cloneable control surface of a running [`SessionController`](crate::SessionController).
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    status: watch::Receiver<SessionStatus>,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<SessionCommand>,
        status: watch::Receiver<SessionStatus>,
    ) -> Self {
        Self { commands, status }
    }

    pub fn join(&self, room: impl Into<RoomCode>) -> Result<(), SessionStopped> {
        self.command(SessionCommand::Join(room.into()))
    }

    pub fn leave(&self) -> Result<(), SessionStopped> {
        self.command(SessionCommand::Leave)
    }

    pub fn retry(&self, remote: PeerId) -> Result<(), SessionStopped> {
        self.command(SessionCommand::Retry(remote))
    }

    pub fn shutdown(&self) -> Result<(), SessionStopped> {
        self.command(SessionCommand::Shutdown)
    }

    pub fn status(&self) -> SessionStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status.clone()
    }

    /// Waits until the published status satisfies `predicate`.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionStatus) -> bool,
    ) -> Result<SessionStatus, SessionStopped> {
        let mut rx = self.status.clone();
        let status = rx
            .wait_for(|s| predicate(s))
            .await
            .map_err(|_| SessionStopped)?;
        Ok(status.clone())
    }

    fn command(&self, command: SessionCommand) -> Result<(), SessionStopped> {
        self.commands.send(command).map_err(|_| SessionStopped)
    }
}
