use log::*;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::connection::{ConnectionId, ConnectionRegistry, Delivery, Transport};
use crate::error::{Error, ErrorKind, Result};
use crate::identity::Identity;
use crate::message::{MessagePayload, ServerEvent};
use crate::relay::{Audience, BroadcastRelay, Publication};
use crate::room::{RoomDirectory, RoomId};

/// Point-in-time counters for the chat core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatStats {
    pub open_connections: usize,
    pub active_rooms: usize,
    pub messages_published: u64,
    pub failed_deliveries: u64,
}

/// Entry point the transport layer drives: connection lifecycle, identity
/// binding, room membership and publishing.
pub struct Manager {
    registry: Arc<ConnectionRegistry>,
    directory: Arc<RoomDirectory>,
    relay: BroadcastRelay,
    default_audience: Audience,
}

impl Manager {
    pub fn new() -> Self {
        Self::with_audience(Audience::default())
    }

    /// Create a manager whose `publish` uses the given audience.
    pub fn with_audience(default_audience: Audience) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = Arc::new(RoomDirectory::new());
        let relay = BroadcastRelay::new(registry.clone(), directory.clone());
        Self {
            registry,
            directory,
            relay,
            default_audience,
        }
    }

    /// Register a new anonymous connection and return its unique ID
    pub fn open(&self, transport: Transport) -> ConnectionId {
        let connection_id = self.registry.open(transport);
        info!("Opened chat connection {connection_id}");
        connection_id
    }

    /// Close a connection and remove it from every room it had joined.
    ///
    /// By the time this returns no later publish can observe the connection
    /// as a member. Closing an already-closed connection is a no-op.
    pub fn close(&self, connection_id: &ConnectionId) {
        let Some(rooms) = self.registry.close(connection_id) else {
            trace!("Connection {connection_id} already closed");
            return;
        };
        for room_id in &rooms {
            self.directory.remove_member(room_id, connection_id);
        }
        info!(
            "Closed chat connection {connection_id} (left {} room(s))",
            rooms.len()
        );
    }

    pub fn bind_identity(&self, connection_id: &ConnectionId, identity: Identity) -> Result<()> {
        let username = identity.username.clone();
        self.registry.bind_identity(connection_id, identity)?;
        info!("Bound connection {connection_id} to user {username}");
        Ok(())
    }

    /// Identity cannot be removed from a live connection; unbinding tears the
    /// connection down and the client reconnects anonymously.
    pub fn unbind(&self, connection_id: &ConnectionId) {
        self.close(connection_id);
    }

    pub fn identity_of(&self, connection_id: &ConnectionId) -> Option<Identity> {
        self.registry.identity_of(connection_id)
    }

    pub fn is_open(&self, connection_id: &ConnectionId) -> bool {
        self.registry.is_open(connection_id)
    }

    /// Join a room. Returns `Ok(false)` if the connection had already joined.
    pub fn join_room(&self, connection_id: &ConnectionId, room_id: &RoomId) -> Result<bool> {
        let newly_joined = self.registry.record_join(connection_id, room_id)?;
        self.directory.add_member(room_id, connection_id);

        // A close racing with this join may have missed the room insert above.
        if !self.registry.is_open(connection_id) {
            self.directory.remove_member(room_id, connection_id);
            return Err(Error::new(ErrorKind::UnknownConnection(
                connection_id.clone(),
            )));
        }

        if newly_joined {
            debug!("Connection {connection_id} joined room {room_id}");
        }
        Ok(newly_joined)
    }

    /// Leave one room. Leaving a room that was never joined is a no-op.
    pub fn leave_room(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        self.registry.record_leave(connection_id, room_id);
        let left = self.directory.remove_member(room_id, connection_id);
        if left {
            debug!("Connection {connection_id} left room {room_id}");
        }
        left
    }

    pub fn leave_all_rooms(&self, connection_id: &ConnectionId) {
        for room_id in self.registry.take_rooms(connection_id) {
            self.directory.remove_member(&room_id, connection_id);
        }
    }

    /// Publish with the manager's default audience.
    pub fn publish(
        &self,
        sender: &ConnectionId,
        room_id: &RoomId,
        payload: MessagePayload,
    ) -> Option<Publication> {
        self.relay
            .publish(room_id, Some(sender), payload, self.default_audience)
    }

    pub fn publish_to(
        &self,
        sender: Option<&ConnectionId>,
        room_id: &RoomId,
        payload: MessagePayload,
        audience: Audience,
    ) -> Option<Publication> {
        self.relay.publish(room_id, sender, payload, audience)
    }

    /// Send a server event to a single connection, e.g. a reply to a request.
    pub fn send_to(&self, connection_id: &ConnectionId, event: ServerEvent) -> Delivery {
        self.registry.send_to(connection_id, Arc::new(event))
    }

    pub fn members_of(&self, room_id: &RoomId) -> std::collections::HashSet<ConnectionId> {
        self.directory.members_of(room_id)
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> std::collections::HashSet<RoomId> {
        self.registry.rooms_of(connection_id)
    }

    pub fn stats(&self) -> ChatStats {
        let counters = self.relay.counters();
        ChatStats {
            open_connections: self.registry.len(),
            active_rooms: self.directory.room_count(),
            messages_published: counters.published.load(Ordering::Relaxed),
            failed_deliveries: counters.failed_deliveries.load(Ordering::Relaxed),
        }
    }
}

impl Default for Manager {
    fn default() -> Self {
        Self::new()
    }
}
