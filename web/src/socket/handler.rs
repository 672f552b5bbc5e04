//! WebSocket transport for the chat core.
//!
//! Each upgraded socket is registered with the `chat::Manager` as one
//! connection. A writer task drains the connection's outbound channel into the
//! socket while the read loop decodes client events, so a slow peer only ever
//! backs up its own channel.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chat::{outbound_channel, ClientEvent, ConnectionId, Identity, ServerEvent};
use futures::{SinkExt, StreamExt};
use log::*;
use serde::Deserialize;
use service::config::Config;

use crate::AppState;

/// Largest inbound frame or message a peer may send. The socket layer refuses
/// anything bigger before buffering it, and the connection is closed.
pub(crate) const MAX_FRAME_BYTES: usize = 64 * 1024;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SocketParams {
    token: Option<String>,
}

/// Upgrades to a chat connection. A `token` query parameter binds the
/// connection's identity up front; without one the connection is anonymous.
pub(crate) async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<SocketParams>,
    State(app_state): State<AppState>,
) -> Response {
    let identity = match params.token.as_deref() {
        Some(token) => match identity_from_token(&app_state.config, token) {
            Some(identity) => Some(identity),
            None => return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
        },
        None => None,
    };

    ws.max_message_size(MAX_FRAME_BYTES)
        .max_frame_size(MAX_FRAME_BYTES)
        .on_upgrade(move |socket| handle_socket(socket, app_state, identity))
}

fn identity_from_token(config: &Config, token: &str) -> Option<Identity> {
    match domain::jwt::verify_token(config, token) {
        Ok(claims) => Some(Identity::new(claims.sub, claims.username)),
        Err(err) => {
            debug!("Rejecting chat token: {err}");
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, app_state: AppState, identity: Option<Identity>) {
    let (tx, mut rx) = outbound_channel();
    let connection_id = app_state.chat_manager.open(tx);
    info!("Chat connection {connection_id} opened");

    if let Some(identity) = identity {
        bind(&app_state, &connection_id, identity);
    }

    let (mut ws_tx, mut ws_rx) = socket.split();

    let writer_id = connection_id.clone();
    let mut writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let json = match serde_json::to_string(event.as_ref()) {
                Ok(json) => json,
                Err(err) => {
                    error!("Failed to serialize event for {writer_id}: {err}");
                    continue;
                }
            };
            if ws_tx.send(WsMessage::Text(json)).await.is_err() {
                debug!("Socket for {writer_id} stopped accepting frames");
                break;
            }
        }
    });

    let reader_id = connection_id.clone();
    let reader_state = app_state.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(frame) = ws_rx.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => handle_frame(&reader_state, &reader_id, &text),
                Ok(WsMessage::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    debug!("Socket error on {reader_id}: {err}");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }

    app_state.chat_manager.close(&connection_id);
}

fn handle_frame(app_state: &AppState, connection_id: &ConnectionId, text: &str) {
    let manager = &app_state.chat_manager;

    let event = match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => event,
        Err(err) => {
            debug!("Malformed frame from {connection_id}: {err}");
            reply_error(app_state, connection_id, "malformed event");
            return;
        }
    };

    match event {
        ClientEvent::JoinRoom(room_id) => {
            if let Err(err) = manager.join_room(connection_id, &room_id) {
                warn!("Join of room {room_id} by {connection_id} failed: {err}");
            }
        }
        ClientEvent::LeaveRoom(room_id) => {
            manager.leave_room(connection_id, &room_id);
        }
        ClientEvent::SendMessage(send) => {
            let room_id = send.room_id.clone();
            manager.publish(connection_id, &room_id, send.into());
        }
        ClientEvent::Authenticate { token } => {
            match identity_from_token(&app_state.config, &token) {
                Some(identity) => bind(app_state, connection_id, identity),
                None => reply_error(app_state, connection_id, "invalid token"),
            }
        }
    }
}

fn bind(app_state: &AppState, connection_id: &ConnectionId, identity: Identity) {
    let manager = &app_state.chat_manager;
    match manager.bind_identity(connection_id, identity.clone()) {
        Ok(()) => {
            info!(
                "Chat connection {connection_id} bound to user {}",
                identity.id
            );
            manager.send_to(connection_id, ServerEvent::IdentityBound(identity));
        }
        Err(err) => {
            warn!("Could not bind identity on {connection_id}: {err}");
            reply_error(app_state, connection_id, &err.to_string());
        }
    }
}

fn reply_error(app_state: &AppState, connection_id: &ConnectionId, reason: &str) {
    app_state.chat_manager.send_to(
        connection_id,
        ServerEvent::Error {
            reason: reason.to_string(),
        },
    );
}
