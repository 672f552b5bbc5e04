//! Per-room merge of optimistic local sends with the relayed message stream.
//!
//! A sent message is shown immediately as a `Pending` entry. When the relay
//! echoes it back, the echo is matched to the oldest unconfirmed entry with
//! the same sender and text inside the dedup window, and that entry takes the
//! server's timestamp and sequence instead of a second copy being appended.
//! Entries are never removed or reordered.

use chat::{Message, RoomId, SendMessage, Sender};
use chrono::{DateTime, Duration, Utc};
use log::*;

pub const DEFAULT_DEDUP_WINDOW_SECS: i64 = 10;

pub type LocalId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    /// Sent locally, waiting for the relay's echo.
    Pending,
    /// The send never reached the relay.
    Unsent,
    /// Authoritative: either relayed from someone else or a confirmed echo.
    Confirmed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub local_id: LocalId,
    pub sender_id: String,
    pub sender_name: String,
    pub text: String,
    /// Local send time until confirmed, then the relay's timestamp.
    pub timestamp: DateTime<Utc>,
    pub sequence: Option<u64>,
    pub state: EntryState,
}

impl Entry {
    pub fn is_unconfirmed(&self) -> bool {
        matches!(self.state, EntryState::Pending | EntryState::Unsent)
    }
}

/// What `receive` did with a relayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciled {
    /// Appended as a new entry at this position.
    Appended(usize),
    /// Matched and confirmed the local entry at this position.
    Confirmed(usize),
    /// The message belongs to another room.
    Ignored,
}

#[derive(Debug)]
pub struct Reconciler {
    room_id: RoomId,
    local_sender: Sender,
    dedup_window: Duration,
    entries: Vec<Entry>,
    next_local_id: LocalId,
}

impl Reconciler {
    pub fn new(room_id: RoomId, local_sender: Sender, dedup_window: Duration) -> Self {
        Self {
            room_id,
            local_sender,
            dedup_window,
            entries: Vec::new(),
            next_local_id: 1,
        }
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn local_sender(&self) -> &Sender {
        &self.local_sender
    }

    /// Append a provisional entry and build the event to publish it.
    /// Blank text is rejected locally, the same way the relay would drop it.
    pub fn send(&mut self, text: &str, now: DateTime<Utc>) -> Option<(LocalId, SendMessage)> {
        if text.trim().is_empty() {
            return None;
        }

        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.entries.push(Entry {
            local_id,
            sender_id: self.local_sender.id().to_string(),
            sender_name: self.local_sender.display_name().to_string(),
            text: text.to_string(),
            timestamp: now,
            sequence: None,
            state: EntryState::Pending,
        });

        let event = SendMessage {
            room_id: self.room_id.clone(),
            sender_id: Some(self.local_sender.id().to_string()),
            text: text.to_string(),
        };
        Some((local_id, event))
    }

    /// Flag a still-pending entry as unsent. Returns `false` if there is no
    /// such pending entry.
    pub fn mark_unsent(&mut self, local_id: LocalId) -> bool {
        match self
            .entries
            .iter_mut()
            .find(|entry| entry.local_id == local_id && entry.state == EntryState::Pending)
        {
            Some(entry) => {
                entry.state = EntryState::Unsent;
                true
            }
            None => false,
        }
    }

    pub fn receive(&mut self, message: Message) -> Reconciled {
        if message.room_id != self.room_id {
            debug!(
                "Ignoring message for room {} in view of {}",
                message.room_id, self.room_id
            );
            return Reconciled::Ignored;
        }

        if message.sender_id == self.local_sender.id() {
            if let Some(index) = self.matching_unconfirmed(&message) {
                let entry = &mut self.entries[index];
                entry.timestamp = message.timestamp;
                entry.sequence = Some(message.sequence);
                entry.sender_name = message.sender_name;
                entry.state = EntryState::Confirmed;
                trace!("Confirmed local message {} as #{}", entry.local_id, message.sequence);
                return Reconciled::Confirmed(index);
            }
        }

        let local_id = self.next_local_id;
        self.next_local_id += 1;
        self.entries.push(Entry {
            local_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            text: message.text,
            timestamp: message.timestamp,
            sequence: Some(message.sequence),
            state: EntryState::Confirmed,
        });
        Reconciled::Appended(self.entries.len() - 1)
    }

    fn matching_unconfirmed(&self, message: &Message) -> Option<usize> {
        self.entries.iter().position(|entry| {
            entry.is_unconfirmed()
                && entry.text == message.text
                && (message.timestamp - entry.timestamp).abs() <= self.dedup_window
        })
    }

    /// The display sequence, oldest first.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    /// Entries at or after `cursor`, for callers that render incrementally.
    pub fn entries_since(&self, cursor: usize) -> impl Iterator<Item = &Entry> {
        self.entries.iter().skip(cursor)
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
