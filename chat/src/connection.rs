use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::*;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::{Error, ErrorKind, Result};
use crate::identity::{Identity, IdentityState};
use crate::message::ServerEvent;
use crate::room::RoomId;

/// Events a connection may have queued but not yet written to its socket.
/// Past this a member is too slow and further deliveries to it fail.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Outbound half of a connection's transport. The web layer drains the
/// matching receiver into the socket.
pub type Transport = mpsc::Sender<Arc<ServerEvent>>;

/// A transport and the receiver its writer drains.
pub fn outbound_channel() -> (Transport, mpsc::Receiver<Arc<ServerEvent>>) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

/// Unique identifier for a connection (server-generated, never reused)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of a single best-effort delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The connection is no longer registered.
    Closed,
    /// The connection is registered but its transport is gone or its queue
    /// is full.
    Failed,
}

#[derive(Debug)]
struct ConnectionInfo {
    identity: IdentityState,
    rooms: HashSet<RoomId>,
    sender: Transport,
    opened_at: DateTime<Utc>,
}

/// Live connections and the rooms each one has joined.
///
/// This is the sole owner of connection-to-room mappings used for teardown;
/// the authoritative room membership lives in `RoomDirectory`.
pub struct ConnectionRegistry {
    connections: DashMap<ConnectionId, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a new anonymous connection - O(1)
    pub fn open(&self, sender: Transport) -> ConnectionId {
        let connection_id = ConnectionId::new();

        self.connections.insert(
            connection_id.clone(),
            ConnectionInfo {
                identity: IdentityState::Anonymous,
                rooms: HashSet::new(),
                sender,
                opened_at: Utc::now(),
            },
        );

        connection_id
    }

    /// Unregister a connection and hand back the rooms it had joined.
    /// Returns `None` if the connection was already closed.
    pub fn close(&self, connection_id: &ConnectionId) -> Option<HashSet<RoomId>> {
        self.connections.remove(connection_id).map(|(_, info)| {
            debug!(
                "Closing connection {connection_id} after {}s",
                (Utc::now() - info.opened_at).num_seconds()
            );
            info.rooms
        })
    }

    pub fn is_open(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn bind_identity(&self, connection_id: &ConnectionId, identity: Identity) -> Result<()> {
        let mut info = self.get_mut(connection_id)?;
        info.identity.bind(connection_id, identity)
    }

    pub fn identity_of(&self, connection_id: &ConnectionId) -> Option<Identity> {
        self.connections
            .get(connection_id)
            .and_then(|info| info.identity.identity().cloned())
    }

    /// Record that a connection joined a room. Returns `Ok(false)` if it had
    /// already joined.
    pub fn record_join(&self, connection_id: &ConnectionId, room_id: &RoomId) -> Result<bool> {
        let mut info = self.get_mut(connection_id)?;
        Ok(info.rooms.insert(room_id.clone()))
    }

    pub fn record_leave(&self, connection_id: &ConnectionId, room_id: &RoomId) -> bool {
        self.connections
            .get_mut(connection_id)
            .is_some_and(|mut info| info.rooms.remove(room_id))
    }

    /// Forget every room a connection had joined, returning them.
    pub fn take_rooms(&self, connection_id: &ConnectionId) -> HashSet<RoomId> {
        self.connections
            .get_mut(connection_id)
            .map(|mut info| std::mem::take(&mut info.rooms))
            .unwrap_or_default()
    }

    pub fn rooms_of(&self, connection_id: &ConnectionId) -> HashSet<RoomId> {
        self.connections
            .get(connection_id)
            .map(|info| info.rooms.clone())
            .unwrap_or_default()
    }

    /// Send an event to one connection - O(1). Never blocks.
    pub fn send_to(&self, connection_id: &ConnectionId, event: Arc<ServerEvent>) -> Delivery {
        let Some(info) = self.connections.get(connection_id) else {
            return Delivery::Closed;
        };

        match info.sender.try_send(event) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) => {
                warn!(
                    "Outbound queue for connection {connection_id} is full; dropping event"
                );
                Delivery::Failed
            }
            Err(TrySendError::Closed(_)) => {
                warn!(
                    "Failed to send event to connection {connection_id}: transport closed. Connection will be cleaned up."
                );
                Delivery::Failed
            }
        }
    }

    fn get_mut(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<dashmap::mapref::one::RefMut<'_, ConnectionId, ConnectionInfo>> {
        self.connections
            .get_mut(connection_id)
            .ok_or_else(|| Error::new(ErrorKind::UnknownConnection(connection_id.clone())))
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
