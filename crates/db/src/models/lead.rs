use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::stage::{DealRecord, LeadQualifiedRecord, OpportunityRecord, ProspectRecord, SuspectRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub status: LeadStatus,
    pub notes: Option<String>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub assigned_to: Option<ObjectId>,
    pub created_by: ObjectId,
    pub suspect: Option<SuspectRecord>,
    pub prospect: Option<ProspectRecord>,
    pub lead_qualified: Option<LeadQualifiedRecord>,
    pub opportunity: Option<OpportunityRecord>,
    pub deal: Option<DealRecord>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// Temperature of a lead. The funnel position lives in the stage records.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    #[default]
    Cold,
    Warm,
    Hot,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Cold => "cold",
            LeadStatus::Warm => "warm",
            LeadStatus::Hot => "hot",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    pub description: String,
    pub due_date: Option<DateTime>,
    #[serde(default)]
    pub completed: bool,
    pub completed_at: Option<DateTime>,
    pub created_by: ObjectId,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ActivityType {
    Call,
    Email,
    Meeting,
    Note,
    FollowUp,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Call => "call",
            ActivityType::Email => "email",
            ActivityType::Meeting => "meeting",
            ActivityType::Note => "note",
            ActivityType::FollowUp => "follow-up",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Lead {
    pub const COLLECTION: &'static str = "leads";

    pub fn activity_mut(&mut self, activity_id: ObjectId) -> Option<&mut Activity> {
        self.activities.iter_mut().find(|a| a.id == activity_id)
    }
}
