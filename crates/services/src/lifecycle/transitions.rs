//! Pure detection of notifiable lead changes.

use bson::oid::ObjectId;
use leadflow_db::models::{Activity, ActivityType, Lead, LeadStatus, NotificationType};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub kind: NotificationType,
    /// Preference category consulted before dispatch.
    pub category: NotificationType,
    pub recipient: ObjectId,
    pub title: &'static str,
    pub message: String,
}

impl Transition {
    fn new(kind: NotificationType, recipient: ObjectId, title: &'static str, message: String) -> Self {
        Self {
            kind,
            category: kind,
            recipient,
            title,
            message,
        }
    }
}

pub fn on_create(lead: &Lead, actor: ObjectId) -> Option<Transition> {
    let assignee = lead.assigned_to.filter(|a| *a != actor)?;
    Some(Transition::new(
        NotificationType::LeadAssignment,
        assignee,
        "New Lead Assigned",
        format!("A new lead ({}) has been assigned to you", lead.name),
    ))
}

/// What an update asked for, captured before the patch is consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestedChange {
    pub status: Option<LeadStatus>,
    /// `Some(None)` is an explicit unassign.
    pub assigned_to: Option<Option<ObjectId>>,
}

/// Status and assignment transitions, compared against the pre-merge lead.
/// Each fires independently.
pub fn on_update(
    before: &Lead,
    after: &Lead,
    requested: RequestedChange,
    actor: ObjectId,
) -> Vec<Transition> {
    let mut transitions = Vec::new();

    if let Some(status) = requested.status.filter(|s| *s != before.status) {
        if let Some(assignee) = after.assigned_to.filter(|a| *a != actor) {
            transitions.push(Transition::new(
                NotificationType::LeadUpdate,
                assignee,
                "Lead Status Updated",
                format!(
                    "Lead {} status changed from {} to {}",
                    after.name, before.status, status
                ),
            ));
        }
    }

    if let Some(Some(assignee)) = requested.assigned_to {
        if Some(assignee) != before.assigned_to && assignee != actor {
            transitions.push(Transition::new(
                NotificationType::LeadAssignment,
                assignee,
                "Lead Assigned",
                format!("Lead {} has been assigned to you", after.name),
            ));
        }
    }

    transitions
}

/// Every activity notifies the assignee, or the actor on unassigned leads.
pub fn on_activity(lead: &Lead, activity: &Activity, actor: ObjectId) -> Transition {
    let recipient = lead.assigned_to.unwrap_or(actor);
    match (activity.activity_type, activity.due_date) {
        (ActivityType::FollowUp, Some(due)) => Transition {
            kind: NotificationType::Activity,
            category: NotificationType::FollowUp,
            recipient,
            title: "New Lead Activity",
            message: format!(
                "Follow-up for lead {} is scheduled for {}",
                lead.name,
                due.to_chrono().format("%Y-%m-%d")
            ),
        },
        (kind, _) => Transition::new(
            NotificationType::Activity,
            recipient,
            "New Lead Activity",
            format!(
                "New {} activity on lead {}: {}",
                kind, lead.name, activity.description
            ),
        ),
    }
}
