use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    pub recipient: ObjectId,
    pub related_lead: Option<ObjectId>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum NotificationType {
    LeadUpdate,
    LeadAssignment,
    FollowUp,
    Activity,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::LeadUpdate => "leadUpdate",
            NotificationType::LeadAssignment => "leadAssignment",
            NotificationType::FollowUp => "followUp",
            NotificationType::Activity => "activity",
        }
    }
}

impl Notification {
    pub const COLLECTION: &'static str = "notifications";
}
