//! Push-path WebSocket endpoint.
//!
//! Speaks the subscribe/unsubscribe/ping protocol and forwards hub messages
//! to the socket. The hub queues updates; this task drains its own queue, so
//! a slow socket only backs up itself.

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::hub::{SubscriberId, NETWORK_CHANNEL};
use crate::models::{ClientMessage, ServerMessage};

use super::routes::AppState;

pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    debug!("websocket client connected");

    let mut subscription: Option<(SubscriberId, mpsc::Receiver<Arc<str>>)> = None;

    loop {
        tokio::select! {
            // Forward queued hub updates once subscribed.
            update = recv_update(&mut subscription) => {
                match update {
                    Some(payload) => {
                        if socket.send(Message::Text(payload.to_string())).await.is_err() {
                            break;
                        }
                    }
                    // Hub evicted us (slow or raced with shutdown).
                    None => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { channel }) => {
                                let channel = channel.unwrap_or_else(|| NETWORK_CHANNEL.to_string());
                                if let Some((old_id, _)) = subscription.take() {
                                    state.hub.unsubscribe(old_id);
                                }
                                debug!(channel = %channel, "client subscribed");
                                subscription = Some(state.hub.subscribe(&channel));
                            }
                            Ok(ClientMessage::Unsubscribe) => {
                                if let Some((id, _)) = subscription.take() {
                                    state.hub.unsubscribe(id);
                                }
                            }
                            Ok(ClientMessage::Ping) => {
                                let pong = serde_json::to_string(&ServerMessage::Pong)
                                    .unwrap_or_else(|_| "{}".to_string());
                                if socket.send(Message::Text(pong)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "unrecognized websocket message");
                            }
                        }
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    if let Some((id, _)) = subscription {
        state.hub.unsubscribe(id);
    }
    debug!("websocket client disconnected");
}

/// Receive the next queued update, or stay pending until a subscription
/// exists so the select arm never busy-loops.
async fn recv_update(
    subscription: &mut Option<(SubscriberId, mpsc::Receiver<Arc<str>>)>,
) -> Option<Arc<str>> {
    match subscription {
        Some((_, rx)) => rx.recv().await,
        None => std::future::pending().await,
    }
}
