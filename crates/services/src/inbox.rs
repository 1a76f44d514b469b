use bson::oid::ObjectId;
use leadflow_db::models::{Lead, Notification, NotificationType};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::actor::Actor;
use crate::dao::base::{DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::store::{LeadStore, NotificationStore};

pub const DEFAULT_NOTIFICATION_LIMIT: u64 = 10;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummary {
    pub id: String,
    pub name: String,
    pub company: Option<String>,
}

impl From<&Lead> for LeadSummary {
    fn from(lead: &Lead) -> Self {
        Self {
            id: lead.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: lead.name.clone(),
            company: lead.company.clone(),
        }
    }
}

/// Wire shape of a notification, shared by the REST inbox and the realtime
/// `notification` event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub message: String,
    pub recipient: String,
    /// `None` once the lead is gone.
    pub related_lead: Option<LeadSummary>,
    pub read: bool,
    pub created_at: String,
}

impl NotificationView {
    pub fn new(notification: &Notification, related_lead: Option<LeadSummary>) -> Self {
        Self {
            id: notification.id.map(|id| id.to_hex()).unwrap_or_default(),
            notification_type: notification.notification_type,
            message: notification.message.clone(),
            recipient: notification.recipient.to_hex(),
            related_lead,
            read: notification.read,
            created_at: notification
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}

/// Read-state operations on a user's own notifications.
pub struct NotificationInbox {
    notifications: Arc<dyn NotificationStore>,
    leads: Arc<dyn LeadStore>,
}

impl NotificationInbox {
    pub fn new(notifications: Arc<dyn NotificationStore>, leads: Arc<dyn LeadStore>) -> Self {
        Self {
            notifications,
            leads,
        }
    }

    pub async fn mark_read(&self, id: ObjectId, actor: &Actor) -> DaoResult<NotificationView> {
        let mut notification = self.notifications.find_by_id(id).await?;
        if notification.recipient != actor.id {
            return Err(DaoError::Forbidden(
                "Not authorized to update this notification".to_string(),
            ));
        }
        if !notification.read {
            self.notifications.mark_read(id).await?;
            notification.read = true;
        }
        let related = self.resolve(notification.related_lead.into_iter().collect()).await?;
        let summary = notification
            .related_lead
            .and_then(|lead_id| related.get(&lead_id).cloned());
        Ok(NotificationView::new(&notification, summary))
    }

    pub async fn mark_all_read(&self, actor: &Actor) -> DaoResult<u64> {
        let modified = self.notifications.mark_all_read(actor.id).await?;
        debug!(user_id = ?actor.id, modified, "Marked all notifications read");
        Ok(modified)
    }

    pub async fn unread_count(&self, actor: &Actor) -> DaoResult<u64> {
        self.notifications.count_unread(actor.id).await
    }

    /// Newest first. Dangling lead references resolve to `None`.
    pub async fn list(
        &self,
        actor: &Actor,
        page: Option<u64>,
        limit: Option<u64>,
    ) -> DaoResult<PaginatedResult<NotificationView>> {
        let params = PaginationParams::new(
            page.unwrap_or(1),
            limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT),
        );
        let result = self
            .notifications
            .list_for_recipient(actor.id, &params)
            .await?;

        let mut lead_ids: Vec<ObjectId> =
            result.items.iter().filter_map(|n| n.related_lead).collect();
        lead_ids.sort();
        lead_ids.dedup();
        let related = self.resolve(lead_ids).await?;

        Ok(result.map(|n| {
            let summary = n.related_lead.and_then(|id| related.get(&id).cloned());
            NotificationView::new(&n, summary)
        }))
    }

    async fn resolve(&self, lead_ids: Vec<ObjectId>) -> DaoResult<HashMap<ObjectId, LeadSummary>> {
        if lead_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let leads = self.leads.find_by_ids(&lead_ids).await?;
        Ok(leads
            .iter()
            .filter_map(|lead| lead.id.map(|id| (id, LeadSummary::from(lead))))
            .collect())
    }
}
