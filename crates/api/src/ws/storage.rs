use axum::extract::ws::{Message, WebSocket};
use bson::oid::ObjectId;
use dashmap::DashMap;
use futures::stream::SplitSink;
use std::sync::Arc;
use tokio::sync::Mutex;

pub type WsSender = Arc<Mutex<SplitSink<WebSocket, Message>>>;

/// Realtime rooms keyed by user id. A user may have several joined
/// connections (tabs, devices); each is tracked by its connection id.
pub struct WsStorage {
    rooms: DashMap<ObjectId, Vec<(String, WsSender)>>,
}

impl WsStorage {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
        }
    }

    /// Joining twice with the same connection is a no-op.
    pub fn join(&self, room: ObjectId, connection_id: String, sender: WsSender) {
        let mut members = self.rooms.entry(room).or_default();
        if !members.iter().any(|(id, _)| *id == connection_id) {
            members.push((connection_id, sender));
        }
    }

    pub fn leave(&self, room: &ObjectId, connection_id: &str) {
        if let Some(mut members) = self.rooms.get_mut(room) {
            members.retain(|(id, _)| id != connection_id);
            if members.is_empty() {
                drop(members);
                self.rooms.remove_if(room, |_, members| members.is_empty());
            }
        }
    }

    pub fn get_senders(&self, room: &ObjectId) -> Vec<WsSender> {
        self.rooms
            .get(room)
            .map(|members| members.iter().map(|(_, s)| s.clone()).collect())
            .unwrap_or_default()
    }

    pub fn connection_count(&self) -> usize {
        self.rooms.iter().map(|r| r.value().len()).sum()
    }
}

impl Default for WsStorage {
    fn default() -> Self {
        Self::new()
    }
}
