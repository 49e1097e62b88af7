use crate::error::RelayError;
use crate::room::{MembershipEvent, RoomRegistry};
use crate::signaling::SignalingOutput;
use huddle_core::{ClientSignal, IceServerConfig, PeerId, RoomCode, ServerSignal};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Routes client signals: membership changes go through the registry and
/// fan out to the room, addressed negotiation messages go to one recipient.
#[derive(Clone)]
pub struct Relay {
    registry: Arc<RoomRegistry>,
    output: Arc<dyn SignalingOutput>,
    ice_servers: Arc<Vec<IceServerConfig>>,
}

impl Relay {
    pub fn new(
        registry: Arc<RoomRegistry>,
        output: Arc<dyn SignalingOutput>,
        ice_servers: Vec<IceServerConfig>,
    ) -> Self {
        Self {
            registry,
            output,
            ice_servers: Arc::new(ice_servers),
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Greets a freshly connected transport with its identity and ICE servers.
    pub async fn connect(&self, peer_id: PeerId) {
        self.deliver(peer_id, ServerSignal::Welcome { peer_id }).await;
        self.deliver(
            peer_id,
            ServerSignal::IceConfig {
                ice_servers: self.ice_servers.as_ref().clone(),
            },
        )
        .await;
    }

    pub async fn handle(&self, peer_id: PeerId, signal: ClientSignal) {
        match signal {
            ClientSignal::Join { room } => self.join(peer_id, room).await,
            ClientSignal::Leave => {
                self.leave(peer_id).await;
            }
            addressed => self.forward(peer_id, addressed).await,
        }
    }

    pub async fn join(&self, peer_id: PeerId, room: RoomCode) {
        let outcome = self.registry.join(peer_id, room.clone());

        if let Some(previous) = outcome.left {
            self.broadcast_membership_change(&previous, MembershipEvent::Left(peer_id))
                .await;
        }

        self.snapshot_on_join(peer_id, &room, outcome.existing)
            .await;

        if outcome.newly_joined {
            self.broadcast_membership_change(&room, MembershipEvent::Joined(peer_id))
                .await;
        }
    }

    /// Removes the peer from its room and tells the remaining members.
    /// Safe to call for a peer that is in no room.
    pub async fn leave(&self, peer_id: PeerId) -> Option<RoomCode> {
        let room = self.registry.leave(&peer_id)?;
        self.broadcast_membership_change(&room, MembershipEvent::Left(peer_id))
            .await;
        Some(room)
    }

    pub async fn disconnect(&self, peer_id: PeerId) {
        info!("Peer {} disconnected", peer_id);
        self.leave(peer_id).await;
    }

    /// Sends a membership event to every member of `room` except its subject.
    /// Runs after the registry mutation, so the member list is already final.
    pub async fn broadcast_membership_change(&self, room: &RoomCode, event: MembershipEvent) {
        let subject = event.subject();
        for member in self.registry.members(room) {
            if member == subject {
                continue;
            }
            self.deliver(member, event.to_signal()).await;
        }
    }

    /// Stamps the sender and passes an addressed message on verbatim.
    pub async fn forward(&self, from: PeerId, signal: ClientSignal) {
        let Some(to) = signal.recipient() else {
            warn!("Peer {} sent an unaddressed message to forward", from);
            return;
        };
        let Some(relayed) = signal.into_relayed(from) else {
            return;
        };
        debug!("Forwarding {} -> {}", from, to);
        self.deliver(to, relayed).await;
    }

    async fn snapshot_on_join(&self, peer_id: PeerId, room: &RoomCode, existing: Vec<PeerId>) {
        if existing.is_empty() {
            return;
        }
        self.deliver(
            peer_id,
            ServerSignal::MembershipSnapshot {
                room: room.clone(),
                members: existing,
            },
        )
        .await;
    }

    async fn deliver(&self, to: PeerId, signal: ServerSignal) {
        match self.output.send_signal(to, signal).await {
            Ok(()) => {}
            Err(RelayError::UnknownTarget(peer)) => {
                debug!("Dropping signal for disconnected peer {}", peer);
            }
            Err(e) => warn!("Failed to deliver signal to {}: {}", to, e),
        }
    }
}
