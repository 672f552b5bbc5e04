use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::{Identity, Sender};
use crate::room::RoomId;

/// Trait for getting the wire event name
pub trait EventType {
    fn event_type(&self) -> &'static str;
}

/// Events a client sends over its transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "join-room")]
    JoinRoom(RoomId),
    #[serde(rename = "leave-room")]
    LeaveRoom(RoomId),
    #[serde(rename = "send-message")]
    SendMessage(SendMessage),
    #[serde(rename = "authenticate")]
    Authenticate { token: String },
}

impl EventType for ClientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::JoinRoom(_) => "join-room",
            ClientEvent::LeaveRoom(_) => "leave-room",
            ClientEvent::SendMessage(_) => "send-message",
            ClientEvent::Authenticate { .. } => "authenticate",
        }
    }
}

/// Payload of a `send-message` event.
///
/// `sender_id` is the client's claim; the relay attributes messages from the
/// identity bound to the sending connection instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub room_id: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
    pub text: String,
}

/// Events the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "receive-message")]
    ReceiveMessage(Message),
    #[serde(rename = "identity-bound")]
    IdentityBound(Identity),
    #[serde(rename = "error")]
    Error { reason: String },
}

impl EventType for ServerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ServerEvent::ReceiveMessage(_) => "receive-message",
            ServerEvent::IdentityBound(_) => "identity-bound",
            ServerEvent::Error { .. } => "error",
        }
    }
}

/// The text and claimed sender of a message before the relay stamps it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub claimed_sender_id: Option<String>,
    pub text: String,
}

impl MessagePayload {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            claimed_sender_id: None,
            text: text.into(),
        }
    }

    pub fn claimed_by(mut self, sender_id: impl Into<String>) -> Self {
        self.claimed_sender_id = Some(sender_id.into());
        self
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl From<SendMessage> for MessagePayload {
    fn from(send: SendMessage) -> Self {
        Self {
            claimed_sender_id: send.sender_id,
            text: send.text,
        }
    }
}

/// An authoritative message as stamped by the relay.
///
/// `timestamp` is assigned once, at relay time. `sequence` increases by one
/// per accepted publish within a room and starts at 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub room_id: RoomId,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sequence: u64,
}

impl Message {
    pub(crate) fn stamp(room_id: RoomId, sender: &Sender, text: String, sequence: u64) -> Self {
        Self {
            room_id,
            sender_id: sender.id().to_string(),
            sender_name: sender.display_name().to_string(),
            text,
            timestamp: Utc::now(),
            sequence,
        }
    }
}
