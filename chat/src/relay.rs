//! Fan-out of relayed messages to the current members of a room.
//!
//! Membership is read from the `RoomDirectory` at publish time and never
//! cached. The room stays locked while the message is stamped and enqueued to
//! every member, so publishes accepted into one room reach each member in
//! acceptance order. Enqueueing onto a member's channel never blocks: a dead
//! transport or a full queue only affects its own delivery.

use log::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::connection::{ConnectionId, ConnectionRegistry, Delivery};
use crate::identity::Sender;
use crate::message::{Message, MessagePayload, ServerEvent};
use crate::room::{RoomDirectory, RoomId};

/// Which members of a room receive a published message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Audience {
    /// Every member, including the sending connection.
    #[default]
    Room,
    /// Every member except the sending connection.
    RoomExceptSender,
}

/// Result of one accepted publish.
#[derive(Debug, Clone)]
pub struct Publication {
    pub message: Message,
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub(crate) struct RelayCounters {
    pub(crate) published: AtomicU64,
    pub(crate) failed_deliveries: AtomicU64,
}

pub struct BroadcastRelay {
    registry: Arc<ConnectionRegistry>,
    directory: Arc<RoomDirectory>,
    counters: Arc<RelayCounters>,
}

impl BroadcastRelay {
    pub fn new(registry: Arc<ConnectionRegistry>, directory: Arc<RoomDirectory>) -> Self {
        Self {
            registry,
            directory,
            counters: Arc::new(RelayCounters::default()),
        }
    }

    /// Stamp and deliver a message to everyone currently in `room_id`.
    ///
    /// Returns `None` when nothing was published: blank text, or a sending
    /// connection that is no longer open. A room with no members accepts
    /// nothing either, since there is nobody to deliver to.
    pub fn publish(
        &self,
        room_id: &RoomId,
        sender_connection: Option<&ConnectionId>,
        payload: MessagePayload,
        audience: Audience,
    ) -> Option<Publication> {
        if payload.is_blank() {
            warn!("Ignoring blank message for room {room_id}");
            return None;
        }

        let sender = match sender_connection {
            Some(connection_id) => {
                if !self.registry.is_open(connection_id) {
                    debug!("Ignoring message from closed connection {connection_id}");
                    return None;
                }
                Sender::from(self.registry.identity_of(connection_id))
            }
            None => Sender::Anonymous,
        };

        if let Some(claimed) = payload.claimed_sender_id.as_deref() {
            if claimed != sender.id() {
                warn!(
                    "Connection {:?} claimed sender {claimed} but is bound as {}; using bound identity",
                    sender_connection.map(ConnectionId::as_str),
                    sender.id()
                );
            }
        }

        let text = payload.text;
        let publication = self.directory.with_next_sequence(room_id, |members, sequence| {
            let message = Message::stamp(room_id.clone(), &sender, text, sequence);
            let event = Arc::new(ServerEvent::ReceiveMessage(message.clone()));

            let mut delivered = 0;
            let mut failed = 0;
            for member in members {
                if audience == Audience::RoomExceptSender && Some(member) == sender_connection {
                    continue;
                }
                match self.registry.send_to(member, event.clone()) {
                    Delivery::Delivered => delivered += 1,
                    Delivery::Failed => failed += 1,
                    Delivery::Closed => {
                        trace!("Skipping closed connection {member} in room {room_id}");
                    }
                }
            }

            Publication {
                message,
                delivered,
                failed,
            }
        });

        match &publication {
            Some(publication) => {
                self.counters.published.fetch_add(1, Ordering::Relaxed);
                self.counters
                    .failed_deliveries
                    .fetch_add(publication.failed as u64, Ordering::Relaxed);
                debug!(
                    "Relayed message #{} in room {} to {} member(s), {} failed",
                    publication.message.sequence, room_id, publication.delivered, publication.failed
                );
            }
            None => debug!("Room {room_id} has no members; message dropped"),
        }

        publication
    }

    pub(crate) fn counters(&self) -> &RelayCounters {
        &self.counters
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{outbound_channel, OUTBOUND_QUEUE_CAPACITY};
    use crate::identity::Identity;

    struct Fixture {
        registry: Arc<ConnectionRegistry>,
        directory: Arc<RoomDirectory>,
        relay: BroadcastRelay,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(ConnectionRegistry::new());
        let directory = Arc::new(RoomDirectory::new());
        let relay = BroadcastRelay::new(registry.clone(), directory.clone());
        Fixture {
            registry,
            directory,
            relay,
        }
    }

    fn general() -> RoomId {
        RoomId::parse("general").unwrap()
    }

    fn received_text(event: &ServerEvent) -> &str {
        match event {
            ServerEvent::ReceiveMessage(message) => &message.text,
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn attributes_messages_to_the_bound_identity_not_the_claim() {
        let f = fixture();
        let (tx, mut rx) = outbound_channel();
        let c1 = f.registry.open(tx);
        f.registry
            .bind_identity(&c1, Identity::new("u1", "alice"))
            .unwrap();
        f.directory.add_member(&general(), &c1);

        let publication = f
            .relay
            .publish(
                &general(),
                Some(&c1),
                MessagePayload::new("hi").claimed_by("someone-else"),
                Audience::Room,
            )
            .unwrap();

        assert_eq!(publication.message.sender_id, "u1");
        assert_eq!(publication.message.sender_name, "alice");
        let event = rx.try_recv().unwrap();
        assert_eq!(received_text(&event), "hi");
    }

    #[test]
    fn anonymous_connections_publish_as_anonymous() {
        let f = fixture();
        let (tx, _rx) = outbound_channel();
        let c1 = f.registry.open(tx);
        f.directory.add_member(&general(), &c1);

        let publication = f
            .relay
            .publish(&general(), Some(&c1), MessagePayload::new("hey"), Audience::Room)
            .unwrap();
        assert_eq!(publication.message.sender_id, crate::identity::ANONYMOUS_SENDER_ID);
    }

    #[test]
    fn except_sender_skips_only_the_sending_connection() {
        let f = fixture();
        let (tx1, mut rx1) = outbound_channel();
        let (tx2, mut rx2) = outbound_channel();
        let c1 = f.registry.open(tx1);
        let c2 = f.registry.open(tx2);
        f.directory.add_member(&general(), &c1);
        f.directory.add_member(&general(), &c2);

        let publication = f
            .relay
            .publish(
                &general(),
                Some(&c1),
                MessagePayload::new("hi"),
                Audience::RoomExceptSender,
            )
            .unwrap();

        assert_eq!(publication.delivered, 1);
        assert!(rx1.try_recv().is_err());
        assert_eq!(received_text(&rx2.try_recv().unwrap()), "hi");
    }

    #[test]
    fn broken_member_transport_does_not_stop_fan_out() {
        let f = fixture();
        let (tx1, rx1) = outbound_channel();
        let (tx2, mut rx2) = outbound_channel();
        let (tx3, mut rx3) = outbound_channel();
        let broken = f.registry.open(tx1);
        let c2 = f.registry.open(tx2);
        let c3 = f.registry.open(tx3);
        for connection_id in [&broken, &c2, &c3] {
            f.directory.add_member(&general(), connection_id);
        }
        drop(rx1);

        let publication = f
            .relay
            .publish(&general(), None, MessagePayload::new("still here"), Audience::Room)
            .unwrap();

        assert_eq!(publication.delivered, 2);
        assert_eq!(publication.failed, 1);
        assert_eq!(received_text(&rx2.try_recv().unwrap()), "still here");
        assert_eq!(received_text(&rx3.try_recv().unwrap()), "still here");
        assert_eq!(f.relay.counters().failed_deliveries.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn a_member_with_a_full_queue_does_not_hold_up_the_room() {
        let f = fixture();
        let (slow_tx, _slow_rx) = outbound_channel();
        let (tx, mut rx) = outbound_channel();
        let slow = f.registry.open(slow_tx);
        let c2 = f.registry.open(tx);
        f.directory.add_member(&general(), &slow);
        f.directory.add_member(&general(), &c2);

        for _ in 0..OUTBOUND_QUEUE_CAPACITY {
            f.relay
                .publish(&general(), None, MessagePayload::new("fill"), Audience::Room)
                .unwrap();
            rx.try_recv().unwrap();
        }

        let publication = f
            .relay
            .publish(&general(), None, MessagePayload::new("overflow"), Audience::Room)
            .unwrap();
        assert_eq!(publication.delivered, 1);
        assert_eq!(publication.failed, 1);
        assert_eq!(received_text(&rx.try_recv().unwrap()), "overflow");
    }

    #[test]
    fn blank_text_and_closed_senders_publish_nothing() {
        let f = fixture();
        let (tx, mut rx) = outbound_channel();
        let c1 = f.registry.open(tx);
        f.directory.add_member(&general(), &c1);

        assert!(f
            .relay
            .publish(&general(), Some(&c1), MessagePayload::new("   "), Audience::Room)
            .is_none());
        assert!(rx.try_recv().is_err());

        let (tx2, _rx2) = outbound_channel();
        let gone = f.registry.open(tx2);
        f.registry.close(&gone);
        assert!(f
            .relay
            .publish(&general(), Some(&gone), MessagePayload::new("late"), Audience::Room)
            .is_none());
        assert_eq!(f.relay.counters().published.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn sequence_numbers_follow_acceptance_order() {
        let f = fixture();
        let (tx, mut rx) = outbound_channel();
        let c1 = f.registry.open(tx);
        f.directory.add_member(&general(), &c1);

        for text in ["one", "two", "three"] {
            f.relay
                .publish(&general(), Some(&c1), MessagePayload::new(text), Audience::Room)
                .unwrap();
        }

        let mut seen = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let ServerEvent::ReceiveMessage(message) = event.as_ref() {
                seen.push((message.sequence, message.text.clone()));
            }
        }
        assert_eq!(
            seen,
            vec![
                (1, "one".to_string()),
                (2, "two".to_string()),
                (3, "three".to_string())
            ]
        );
    }
}
