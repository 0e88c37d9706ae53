use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message as WsMessage, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use dashmap::DashMap;
use futures::{sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use workup_common::AppError;
use workup_database::Message;

use crate::domain::parse_id;
use crate::services::AppState;

/// Pushed to a user's open streams as JSON text frames.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    NewMessage { message: Message },
    MessagesRead { reader_id: i32, count: u64 },
}

/// Per-user broadcast channels. Every open stream of a user subscribes to
/// the same channel, and publishing to a user with no open stream is a no-op.
#[derive(Clone)]
pub struct MessageHub {
    channels: Arc<DashMap<i32, broadcast::Sender<StreamEvent>>>,
    capacity: usize,
}

impl MessageHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn subscribe(&self, user_id: i32) -> broadcast::Receiver<StreamEvent> {
        self.channels
            .entry(user_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Returns how many streams received the event.
    pub fn publish(&self, user_id: i32, event: StreamEvent) -> usize {
        // Clone out so the shard lock is not held while sending
        let sender = match self.channels.get(&user_id) {
            Some(sender) => sender.clone(),
            None => return 0,
        };

        match sender.send(event) {
            Ok(delivered) => delivered,
            Err(_) => {
                self.release(user_id);
                0
            }
        }
    }

    /// Drops the user's channel once no stream is listening on it.
    pub fn release(&self, user_id: i32) {
        self.channels.remove_if(&user_id, |_, sender| sender.receiver_count() == 0);
    }

    pub fn subscriber_count(&self, user_id: i32) -> usize {
        self.channels
            .get(&user_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    token: Option<String>,
}

/// `GET /api/messages/stream/:userId?token=` upgrades to a WebSocket that
/// carries the user's new messages and read receipts. The token is checked
/// before the upgrade headers.
pub async fn stream_messages(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    Path(user_id): Path<String>,
    Query(params): Query<StreamQuery>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let user_id = parse_id(&user_id, "user id")?;

    let token = params
        .token
        .as_deref()
        .ok_or_else(|| AppError::Authentication("Missing token".to_string()))?;
    let claims = state
        .jwt_service
        .validate_token(token)
        .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))?;

    if claims.user_id()? != user_id {
        return Err(AppError::Authorization(
            "Token does not belong to this user".to_string(),
        ));
    }

    let ws = ws.map_err(|rejection| AppError::Validation(rejection.body_text()))?;

    let hub = state.hub.clone();
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, user_id, hub)))
}

/// Subscribes only once the upgrade has completed, so abandoned handshakes
/// leave no channel behind.
async fn handle_socket(socket: WebSocket, user_id: i32, hub: MessageHub) {
    let mut events = hub.subscribe(user_id);
    tracing::info!("Message stream opened for user {}", user_id);

    let (mut sender, mut receiver) = socket.split();
    let mut heartbeat = tokio::time::interval(Duration::from_secs(30));

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let payload = match serde_json::to_string(&event) {
                            Ok(payload) => payload,
                            Err(e) => {
                                tracing::error!("Failed to serialize stream event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(WsMessage::Text(payload)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Stream for user {} lagged, {} events dropped", user_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(WsMessage::Ping(data))) => {
                        if sender.send(WsMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!("Stream for user {} errored: {}", user_id, e);
                        break;
                    }
                    // The stream is push-only
                    Some(Ok(_)) => {}
                }
            }

            _ = heartbeat.tick() => {
                if sender.send(WsMessage::Ping(Vec::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    drop(events);
    hub.release(user_id);

    tracing::info!("Message stream closed for user {}", user_id);
}
