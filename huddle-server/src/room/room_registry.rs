use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use huddle_core::{PeerId, RoomCode};
use tracing::{debug, info};

/// Result of [`RoomRegistry::join`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Members other than the caller, in join order.
    pub existing: Vec<PeerId>,
    /// `false` when the caller was already a member of this room.
    pub newly_joined: bool,
    /// Room the caller had to leave to join this one.
    pub left: Option<RoomCode>,
}

/// Room code -> ordered member list.
///
/// Every mutation of a room happens under that room's entry lock, so no
/// reader observes a half-applied join or leave. Rooms in different shards
/// are mutated in parallel.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomCode, Vec<PeerId>>,
    memberships: DashMap<PeerId, RoomCode>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&self, peer_id: PeerId, room: RoomCode) -> JoinOutcome {
        let previous = self.room_of(&peer_id);

        if previous.as_ref() == Some(&room) {
            debug!("Peer {} re-joined room '{}'", peer_id, room);
            return JoinOutcome {
                existing: self.others(&room, &peer_id),
                newly_joined: false,
                left: None,
            };
        }

        let left = match previous {
            Some(_) => self.leave(&peer_id),
            None => None,
        };

        let existing = {
            let mut members = self.rooms.entry(room.clone()).or_insert_with(|| {
                info!("Creating room '{}'", room);
                Vec::new()
            });
            let existing: Vec<PeerId> = members.iter().copied().filter(|m| *m != peer_id).collect();
            if !members.contains(&peer_id) {
                members.push(peer_id);
            }
            existing
        };

        self.memberships.insert(peer_id, room.clone());
        info!("Peer {} joined room '{}' ({} already there)", peer_id, room, existing.len());

        JoinOutcome {
            existing,
            newly_joined: true,
            left,
        }
    }

    /// Removes the peer from its room, deleting the room once empty.
    /// Returns `None` when the peer was in no room.
    pub fn leave(&self, peer_id: &PeerId) -> Option<RoomCode> {
        let (_, room) = self.memberships.remove(peer_id)?;

        if let Entry::Occupied(mut entry) = self.rooms.entry(room.clone()) {
            entry.get_mut().retain(|m| m != peer_id);
            if entry.get().is_empty() {
                entry.remove();
                info!("Room '{}' is empty, removed", room);
            }
        }

        info!("Peer {} left room '{}'", peer_id, room);
        Some(room)
    }

    pub fn room_of(&self, peer_id: &PeerId) -> Option<RoomCode> {
        self.memberships.get(peer_id).map(|r| r.value().clone())
    }

    pub fn members(&self, room: &RoomCode) -> Vec<PeerId> {
        self.rooms
            .get(room)
            .map(|m| m.value().clone())
            .unwrap_or_default()
    }

    pub fn contains_room(&self, room: &RoomCode) -> bool {
        self.rooms.contains_key(room)
    }

    /// Every room with its members, sorted by room code.
    pub fn rooms(&self) -> Vec<(RoomCode, Vec<PeerId>)> {
        let mut rooms: Vec<_> = self
            .rooms
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        rooms.sort_by(|a, b| a.0.cmp(&b.0));
        rooms
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    fn others(&self, room: &RoomCode, peer_id: &PeerId) -> Vec<PeerId> {
        self.members(room)
            .into_iter()
            .filter(|m| m != peer_id)
            .collect()
    }
}
