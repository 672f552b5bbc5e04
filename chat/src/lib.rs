//! Real-time room messaging core.
//!
//! This crate multiplexes many concurrent client connections into named
//! broadcast groups ("rooms") and relays chat messages to every current member
//! of a room.
//!
//! # Architecture
//!
//! - **Session registry**: `ConnectionRegistry` owns each live connection's
//!   outbound transport, its identity state, and the rooms it has joined.
//! - **Room directory**: `RoomDirectory` maps room ids to member connections.
//!   Rooms appear on first join and vanish when their last member leaves.
//! - **Broadcast relay**: `BroadcastRelay` stamps each message with the
//!   server timestamp and a per-room sequence number, then enqueues it to
//!   every member. Delivery is best-effort and isolated per member.
//! - **Identity binder**: a connection starts anonymous and may be bound to an
//!   authenticated identity once. Logging out means closing the connection.
//! - **Ephemeral messages**: nothing is persisted; a member that is offline
//!   misses the message.
//!
//! # Message Flow
//!
//! 1. The transport layer opens a connection with a bounded outbound channel
//! 2. It optionally binds the identity carried by the client's token
//! 3. `join-room` adds the connection to a room
//! 4. `send-message` is published to the room's members at call time
//! 5. Each member's writer task drains its channel into its socket
//!
//! # Example: relaying a message
//!
//! ```rust
//! use chat::{outbound_channel, Manager, MessagePayload, RoomId};
//!
//! let manager = Manager::new();
//! let (tx, mut rx) = outbound_channel();
//! let connection_id = manager.open(tx);
//! let general = RoomId::parse("general").unwrap();
//!
//! manager.join_room(&connection_id, &general).unwrap();
//! manager.publish(&connection_id, &general, MessagePayload::new("hi"));
//!
//! assert!(rx.try_recv().is_ok());
//! ```
//!
//! # Modules
//!
//! - `connection`: ConnectionRegistry and type-safe ConnectionId
//! - `identity`: Identity, Sender and the per-connection identity state machine
//! - `room`: RoomId and RoomDirectory
//! - `relay`: BroadcastRelay fan-out
//! - `manager`: the facade used by the transport layer
//! - `message`: wire events

pub mod connection;
pub mod error;
pub mod identity;
pub mod manager;
pub mod message;
pub mod relay;
pub mod room;

pub use connection::{outbound_channel, ConnectionId, Delivery, Transport, OUTBOUND_QUEUE_CAPACITY};
pub use identity::{Identity, Sender};
pub use manager::{ChatStats, Manager};
pub use message::{ClientEvent, EventType, Message, MessagePayload, SendMessage, ServerEvent};
pub use relay::{Audience, Publication};
pub use room::RoomId;
