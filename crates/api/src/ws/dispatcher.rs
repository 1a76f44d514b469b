use async_trait::async_trait;
use axum::extract::ws::Message;
use bson::oid::ObjectId;
use futures::SinkExt;
use leadflow_services::Broadcaster;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::{WsSender, WsStorage};

/// Sends a JSON frame to every connection joined to `room`.
pub async fn send_to_room(ws_storage: &WsStorage, room: &ObjectId, message: &Value) {
    let text = message.to_string();
    for sender in ws_storage.get_senders(room) {
        send_text(&sender, text.clone()).await;
    }
    debug!(?room, "WS message sent");
}

pub async fn send_to_connection(sender: &WsSender, message: &Value) {
    send_text(sender, message.to_string()).await;
}

async fn send_text(sender: &WsSender, text: String) {
    let mut guard = sender.lock().await;
    if let Err(e) = guard.send(Message::text(text)).await {
        warn!(%e, "Failed to send WS message");
    }
}

/// Realtime broadcaster backed by the process's WebSocket rooms.
pub struct WsBroadcaster {
    storage: Arc<WsStorage>,
}

impl WsBroadcaster {
    pub fn new(storage: Arc<WsStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Broadcaster for WsBroadcaster {
    async fn emit(&self, room: ObjectId, event: &str, payload: Value) {
        let frame = json!({ "type": event, "data": payload });
        send_to_room(&self.storage, &room, &frame).await;
    }
}
