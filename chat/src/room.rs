use dashmap::DashMap;
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::connection::ConnectionId;
use crate::error::{Error, ErrorKind};

/// Client-supplied room identifier. Any non-blank string is a valid room;
/// surrounding whitespace is not part of the id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomId(String);

impl RoomId {
    pub fn parse(raw: impl Into<String>) -> Result<Self, Error> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::new(ErrorKind::InvalidRoomId));
        }
        if trimmed.len() == raw.len() {
            Ok(Self(raw))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        RoomId::parse(raw)
    }
}

impl From<RoomId> for String {
    fn from(room_id: RoomId) -> Self {
        room_id.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
struct Room {
    members: HashSet<ConnectionId>,
    /// Sequence number of the last accepted publish in this room
    last_sequence: u64,
}

/// Maps room ids to their member connections.
///
/// Rooms are created on first `add_member` and dropped as soon as their last
/// member leaves. A room entry is only touched under its DashMap shard lock,
/// so mutations and broadcasts for one room are serialized.
pub struct RoomDirectory {
    rooms: DashMap<RoomId, Room>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Add a member, creating the room if needed. Returns `false` if the
    /// connection was already a member.
    pub fn add_member(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let inserted = self
            .rooms
            .entry(room_id.clone())
            .or_default()
            .members
            .insert(connection_id.clone());

        if inserted {
            trace!("Connection {connection_id} joined room {room_id}");
        }
        inserted
    }

    /// Remove a member, dropping the room once it has no members left.
    /// Removing a non-member is a no-op that returns `false`.
    pub fn remove_member(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        let removed = match self.rooms.get_mut(room_id) {
            Some(mut room) => room.members.remove(connection_id),
            None => false,
        };

        // Emptiness is re-checked under the entry lock; a concurrent join keeps the room.
        if self
            .rooms
            .remove_if(room_id, |_, room| room.members.is_empty())
            .is_some()
        {
            debug!("Room {room_id} removed (empty)");
        }

        if removed {
            trace!("Connection {connection_id} left room {room_id}");
        }
        removed
    }

    /// Snapshot of the current members of a room.
    pub fn members_of(&self, room_id: &RoomId) -> HashSet<ConnectionId> {
        self.rooms
            .get(room_id)
            .map(|room| room.members.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, room_id: &RoomId, connection_id: &ConnectionId) -> bool {
        self.rooms
            .get(room_id)
            .is_some_and(|room| room.members.contains(connection_id))
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Run `f` against the room's members while holding the room's lock,
    /// after advancing the room's sequence number.
    ///
    /// Returns `None` without calling `f` when the room has no members.
    pub(crate) fn with_next_sequence<R>(
        &self,
        room_id: &RoomId,
        f: impl FnOnce(&HashSet<ConnectionId>, u64) -> R,
    ) -> Option<R> {
        let mut room = self.rooms.get_mut(room_id)?;
        room.last_sequence += 1;
        let sequence = room.last_sequence;
        Some(f(&room.members, sequence))
    }
}

impl Default for RoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn general() -> RoomId {
        RoomId::parse("general").unwrap()
    }

    #[test]
    fn blank_room_ids_are_invalid() {
        assert!(RoomId::parse("").is_err());
        assert!(RoomId::parse(" \n").is_err());
        assert_eq!(RoomId::parse("project-42").unwrap().as_str(), "project-42");
    }

    #[test]
    fn room_ids_ignore_surrounding_whitespace() {
        let padded = RoomId::parse(" general\t").unwrap();
        assert_eq!(padded.as_str(), "general");
        assert_eq!(padded, general());

        let from_wire: RoomId = serde_json::from_str("\"  general \"").unwrap();
        assert_eq!(from_wire, general());
    }

    #[test]
    fn rooms_are_created_lazily_on_first_member() {
        let directory = RoomDirectory::new();
        let c1 = ConnectionId::new();
        assert_eq!(directory.room_count(), 0);

        assert!(directory.add_member(&general(), &c1));
        assert_eq!(directory.room_count(), 1);
        assert!(directory.members_of(&general()).contains(&c1));
    }

    #[test]
    fn add_member_is_idempotent() {
        let directory = RoomDirectory::new();
        let c1 = ConnectionId::new();

        assert!(directory.add_member(&general(), &c1));
        assert!(!directory.add_member(&general(), &c1));
        assert_eq!(directory.members_of(&general()).len(), 1);
    }

    #[test]
    fn room_is_dropped_when_last_member_leaves() {
        let directory = RoomDirectory::new();
        let c1 = ConnectionId::new();
        let c2 = ConnectionId::new();
        directory.add_member(&general(), &c1);
        directory.add_member(&general(), &c2);

        assert!(directory.remove_member(&general(), &c1));
        assert_eq!(directory.room_count(), 1);

        assert!(directory.remove_member(&general(), &c2));
        assert_eq!(directory.room_count(), 0);
        assert!(directory.members_of(&general()).is_empty());
    }

    #[test]
    fn removing_a_non_member_is_a_no_op() {
        let directory = RoomDirectory::new();
        let c1 = ConnectionId::new();
        let stranger = ConnectionId::new();
        directory.add_member(&general(), &c1);

        assert!(!directory.remove_member(&general(), &stranger));
        assert!(!directory.remove_member(&RoomId::parse("nowhere").unwrap(), &c1));
        assert!(directory.contains(&general(), &c1));
    }

    #[test]
    fn sequence_advances_per_room_and_restarts_with_a_recreated_room() {
        let directory = RoomDirectory::new();
        let other = RoomId::parse("other").unwrap();
        let c1 = ConnectionId::new();
        directory.add_member(&general(), &c1);
        directory.add_member(&other, &c1);

        assert_eq!(directory.with_next_sequence(&general(), |_, seq| seq), Some(1));
        assert_eq!(directory.with_next_sequence(&general(), |_, seq| seq), Some(2));
        assert_eq!(directory.with_next_sequence(&other, |_, seq| seq), Some(1));

        directory.remove_member(&general(), &c1);
        assert_eq!(directory.with_next_sequence(&general(), |_, seq| seq), None);

        directory.add_member(&general(), &c1);
        assert_eq!(directory.with_next_sequence(&general(), |_, seq| seq), Some(1));
    }
}
