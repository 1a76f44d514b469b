use async_trait::async_trait;
use bson::oid::ObjectId;
use serde_json::Value;

/// Publishes events to every session joined to a user's room.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn emit(&self, room: ObjectId, event: &str, payload: Value);
}
