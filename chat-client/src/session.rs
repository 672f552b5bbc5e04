//! Client-side session controller.
//!
//! A `ChatSession` owns exactly one live transport and the identity it was
//! opened with. Changing identity never mutates the transport: the old one is
//! closed and a new one is opened, and the room view starts over with a fresh
//! `Reconciler` because nothing is stored server-side.

use anyhow::{Context, Result};
use chat::{ClientEvent, Identity, RoomId, Sender, ServerEvent};
use chrono::{Duration, Utc};
use futures_util::{SinkExt, StreamExt};
use log::*;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, http::StatusCode, Message};

use crate::api_client::socket_url;
use crate::reconciler::{LocalId, Reconciled, Reconciler};

/// Something that happened on the session's transport.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    Message(Reconciled),
    IdentityBound(Identity),
    ServerError(String),
    Disconnected,
}

/// One open WebSocket: a writer task fed by `outgoing` and a reader task
/// feeding `incoming`.
struct Connection {
    outgoing: mpsc::UnboundedSender<ClientEvent>,
    incoming: mpsc::UnboundedReceiver<ServerEvent>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl Connection {
    async fn open(url: &str) -> std::result::Result<Self, tungstenite::Error> {
        let (socket, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut sink, mut stream) = socket.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel::<ServerEvent>();

        let writer = tokio::spawn(async move {
            while let Some(event) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        error!("Failed to encode {event:?}: {err}");
                        continue;
                    }
                };
                if let Err(err) = sink.send(Message::text(json)).await {
                    debug!("Socket write failed: {err}");
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if incoming_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!("Ignoring unreadable server frame: {err}"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        debug!("Socket read failed: {err}");
                        break;
                    }
                }
            }
        });

        Ok(Self {
            outgoing,
            incoming,
            writer,
            reader,
        })
    }

    fn send(&self, event: ClientEvent) -> bool {
        self.outgoing.send(event).is_ok()
    }

    async fn close(self) {
        let Connection {
            outgoing,
            writer,
            reader,
            ..
        } = self;
        reader.abort();
        // Dropping the sender lets the writer flush and send a close frame.
        drop(outgoing);
        let abort = writer.abort_handle();
        if tokio::time::timeout(std::time::Duration::from_secs(2), writer)
            .await
            .is_err()
        {
            debug!("Writer did not finish closing in time");
            abort.abort();
        }
    }

    /// Tear down both tasks without waiting on the peer.
    fn abort(self) {
        self.reader.abort();
        self.writer.abort();
    }
}

pub struct ChatSession {
    base_url: String,
    room_id: RoomId,
    dedup_window: Duration,
    token: Option<String>,
    identity: Sender,
    connection: Option<Connection>,
    reconciler: Reconciler,
}

impl ChatSession {
    /// Open an anonymous session viewing `room_id`.
    pub async fn open(base_url: &str, room_id: RoomId, dedup_window: Duration) -> Result<Self> {
        let mut session = Self {
            base_url: base_url.to_string(),
            reconciler: Reconciler::new(room_id.clone(), Sender::Anonymous, dedup_window),
            room_id,
            dedup_window,
            token: None,
            identity: Sender::Anonymous,
            connection: None,
        };
        session.replace_transport().await?;
        Ok(session)
    }

    pub fn identity(&self) -> &Sender {
        &self.identity
    }

    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Switch to an authenticated transport for `identity`.
    pub async fn login(&mut self, token: String, identity: Identity) -> Result<()> {
        info!("Logging in as {}", identity.username);
        self.token = Some(token);
        self.identity = Sender::User(identity);
        self.replace_transport().await
    }

    /// Switch back to an anonymous transport.
    pub async fn logout(&mut self) -> Result<()> {
        info!("Logging out");
        self.token = None;
        self.identity = Sender::Anonymous;
        self.replace_transport().await
    }

    /// The login token is no longer accepted; continue anonymously.
    pub async fn expire_token(&mut self) -> Result<()> {
        warn!("Login token expired; continuing anonymously");
        self.logout().await
    }

    /// Reopen the transport after a disconnect. A token the server now
    /// refuses is treated as expired.
    pub async fn reconnect(&mut self) -> Result<()> {
        match self.replace_transport().await {
            Err(err) if self.token.is_some() && is_unauthorized(&err) => self.expire_token().await,
            other => other,
        }
    }

    /// Leave the current room and start an empty view of `room_id`.
    pub fn switch_room(&mut self, room_id: RoomId) {
        if room_id == self.room_id {
            return;
        }
        if let Some(connection) = &self.connection {
            connection.send(ClientEvent::LeaveRoom(self.room_id.clone()));
            connection.send(ClientEvent::JoinRoom(room_id.clone()));
        }
        info!("Switched from room {} to {room_id}", self.room_id);
        self.room_id = room_id;
        self.reset_view();
    }

    /// Show `text` immediately and hand it to the transport. Without a
    /// working transport the entry stays visible, marked unsent.
    pub fn send(&mut self, text: &str) -> Option<LocalId> {
        let (local_id, event) = self.reconciler.send(text, Utc::now())?;

        let delivered = self
            .connection
            .as_ref()
            .is_some_and(|connection| connection.send(ClientEvent::SendMessage(event)));
        if !delivered {
            debug!("No transport for message {local_id}; marking unsent");
            self.reconciler.mark_unsent(local_id);
        }
        Some(local_id)
    }

    /// Wait for the next event from the server and apply it to the view.
    /// Pends forever while disconnected. Safe to cancel.
    pub async fn next_update(&mut self) -> Update {
        let Some(connection) = self.connection.as_mut() else {
            return std::future::pending().await;
        };

        match connection.incoming.recv().await {
            Some(ServerEvent::ReceiveMessage(message)) => {
                Update::Message(self.reconciler.receive(message))
            }
            Some(ServerEvent::IdentityBound(identity)) => Update::IdentityBound(identity),
            Some(ServerEvent::Error { reason }) => Update::ServerError(reason),
            None => {
                warn!("Connection to the chat server was lost");
                if let Some(connection) = self.connection.take() {
                    connection.abort();
                }
                Update::Disconnected
            }
        }
    }

    /// Close the current transport, if any.
    pub async fn close(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
    }

    /// Close the current transport and open one for the current identity.
    /// On failure the view is kept unless it belongs to another identity, so
    /// unsent entries survive retries.
    async fn replace_transport(&mut self) -> Result<()> {
        self.close().await;
        if self.reconciler.local_sender() != &self.identity {
            self.reset_view();
        }

        let url = socket_url(&self.base_url, self.token.as_deref());
        let connection = Connection::open(&url)
            .await
            .with_context(|| format!("Failed to connect to {}", socket_url(&self.base_url, None)))?;
        self.reset_view();
        connection.send(ClientEvent::JoinRoom(self.room_id.clone()));
        self.connection = Some(connection);

        debug!(
            "Connected to room {} as {}",
            self.room_id,
            self.identity.display_name()
        );
        Ok(())
    }

    fn reset_view(&mut self) {
        self.reconciler =
            Reconciler::new(self.room_id.clone(), self.identity.clone(), self.dedup_window);
    }
}

fn is_unauthorized(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<tungstenite::Error>(),
        Some(tungstenite::Error::Http(response)) if response.status() == StatusCode::UNAUTHORIZED
    )
}
