use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::notification::NotificationType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub fcm_tokens: Vec<FcmToken>,
    #[serde(default)]
    pub notification_preferences: NotificationPrefs,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    Sales,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct FcmToken {
    pub token: String,
    #[serde(default = "default_device_info")]
    pub device_info: String,
    pub last_used: DateTime,
}

/// Per-channel switches consulted before a notification is dispatched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    #[serde(default)]
    pub in_app: ChannelPrefs,
    #[serde(default)]
    pub push: ChannelPrefs,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPrefs {
    #[serde(default = "bool_true")]
    pub lead_updates: bool,
    #[serde(default = "bool_true")]
    pub lead_assignments: bool,
    #[serde(default = "bool_true")]
    pub follow_ups: bool,
}

impl Default for ChannelPrefs {
    fn default() -> Self {
        Self {
            lead_updates: true,
            lead_assignments: true,
            follow_ups: true,
        }
    }
}

impl ChannelPrefs {
    pub fn allows(&self, kind: NotificationType) -> bool {
        match kind {
            NotificationType::LeadUpdate | NotificationType::Activity => self.lead_updates,
            NotificationType::LeadAssignment => self.lead_assignments,
            NotificationType::FollowUp => self.follow_ups,
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_device_info() -> String {
    "Unknown Device".to_string()
}

impl User {
    pub const COLLECTION: &'static str = "users";

    pub fn token_values(&self) -> Vec<String> {
        self.fcm_tokens.iter().map(|t| t.token.clone()).collect()
    }
}
