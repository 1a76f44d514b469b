use axum::{
    extract::{Query, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bson::oid::ObjectId;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::dispatcher::send_to_connection;
use super::storage::WsSender;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: String,
}

pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(params): Query<WsParams>,
    ws: WebSocketUpgrade,
) -> Response {
    // verify before accepting the upgrade
    let claims = match state.auth.verify_access_token(&params.token) {
        Ok(c) => c,
        Err(_) => return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
    };
    let user_id = match ObjectId::parse_str(&claims.sub) {
        Ok(id) => id,
        Err(_) => return (StatusCode::BAD_REQUEST, "Invalid user ID").into_response(),
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: ObjectId) {
    let connection_id = Uuid::new_v4().to_string();
    info!(?user_id, %connection_id, "WebSocket connected");

    let (sender, mut receiver) = socket.split();
    let sender: WsSender = Arc::new(Mutex::new(sender));

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_client_message(&state, user_id, &connection_id, &sender, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(?user_id, %connection_id, %e, "WebSocket error");
                break;
            }
            // axum answers protocol pings itself
            _ => {}
        }
    }

    state.ws_storage.leave(&user_id, &connection_id);
    info!(?user_id, %connection_id, "WebSocket disconnected");
}

/// `join` accepts the user id as a bare string or as `{userId}`.
fn requested_room(data: Option<&Value>) -> Option<ObjectId> {
    let raw = match data? {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map.get("userId")?.as_str()?,
        _ => return None,
    };
    ObjectId::parse_str(raw).ok()
}

async fn handle_client_message(
    state: &AppState,
    user_id: ObjectId,
    connection_id: &str,
    sender: &WsSender,
    text: &str,
) {
    let parsed: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(_) => {
            let frame = json!({ "type": "error", "data": { "message": "Malformed frame" } });
            send_to_connection(sender, &frame).await;
            return;
        }
    };

    let msg_type = parsed.get("type").and_then(|t| t.as_str()).unwrap_or("");
    debug!(?user_id, %connection_id, msg_type, "WS message received");

    match msg_type {
        "join" => match requested_room(parsed.get("data")) {
            Some(room) if room == user_id => {
                state
                    .ws_storage
                    .join(room, connection_id.to_string(), sender.clone());
                let frame = json!({ "type": "joined", "data": { "room": room.to_hex() } });
                send_to_connection(sender, &frame).await;
            }
            Some(room) => {
                warn!(?user_id, ?room, "Refused join for foreign room");
                let frame = json!({
                    "type": "error",
                    "data": { "message": "Cannot join another user's room" }
                });
                send_to_connection(sender, &frame).await;
            }
            None => {
                let frame = json!({ "type": "error", "data": { "message": "Invalid room" } });
                send_to_connection(sender, &frame).await;
            }
        },
        "ping" => {
            send_to_connection(sender, &json!({ "type": "pong" })).await;
        }
        _ => {
            debug!(?user_id, msg_type, "Unknown WS message type");
        }
    }
}
