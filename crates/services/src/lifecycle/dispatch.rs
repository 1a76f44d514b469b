use bson::DateTime;
use leadflow_db::models::{Lead, Notification};
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::transitions::Transition;
use crate::inbox::{LeadSummary, NotificationView};
use crate::push::{PushJob, PushMessage, PushQueue};
use crate::realtime::Broadcaster;
use crate::store::{NotificationStore, UserStore};

pub const NOTIFICATION_EVENT: &str = "notification";

/// Fans a transition out to the in-app record, the recipient's realtime
/// room and their devices. Failures are logged and never reach the caller.
pub struct NotificationDispatcher {
    notifications: Arc<dyn NotificationStore>,
    users: Arc<dyn UserStore>,
    broadcaster: Arc<dyn Broadcaster>,
    push: Option<Arc<PushQueue>>,
    click_action: String,
}

impl NotificationDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationStore>,
        users: Arc<dyn UserStore>,
        broadcaster: Arc<dyn Broadcaster>,
        push: Option<Arc<PushQueue>>,
        click_action: String,
    ) -> Self {
        Self {
            notifications,
            users,
            broadcaster,
            push,
            click_action,
        }
    }

    /// Returns the persisted notification, if in-app delivery was allowed
    /// and the write succeeded.
    pub async fn dispatch(&self, lead: &Lead, transition: Transition) -> Option<Notification> {
        let Some(lead_id) = lead.id else {
            error!(lead = %lead.name, "Cannot notify about an unsaved lead");
            return None;
        };
        let recipient = match self.users.find_by_id(transition.recipient).await {
            Ok(user) => user,
            Err(e) => {
                warn!(recipient = ?transition.recipient, error = %e, "Notification recipient not found");
                return None;
            }
        };
        let prefs = recipient.notification_preferences;
        let in_app = prefs.in_app.allows(transition.category);
        let push = prefs.push.allows(transition.category);
        if !in_app && !push {
            debug!(recipient = ?transition.recipient, kind = transition.kind.as_str(), "All channels muted");
            return None;
        }

        let mut persisted = None;
        if in_app {
            let notification = Notification {
                id: None,
                notification_type: transition.kind,
                message: transition.message.clone(),
                recipient: transition.recipient,
                related_lead: Some(lead_id),
                read: false,
                created_at: DateTime::now(),
            };
            match self.notifications.insert(&notification).await {
                Ok(saved) => {
                    let view = NotificationView::new(&saved, Some(LeadSummary::from(lead)));
                    match serde_json::to_value(&view) {
                        Ok(payload) => {
                            self.broadcaster
                                .emit(transition.recipient, NOTIFICATION_EVENT, payload)
                                .await
                        }
                        Err(e) => error!(error = %e, "Failed to serialize notification"),
                    }
                    persisted = Some(saved);
                }
                Err(e) => {
                    error!(recipient = ?transition.recipient, error = %e, "Failed to persist notification");
                }
            }
        }

        if push {
            self.enqueue_push(lead, &transition, recipient.token_values(), persisted.as_ref());
        }
        persisted
    }

    fn enqueue_push(
        &self,
        lead: &Lead,
        transition: &Transition,
        tokens: Vec<String>,
        notification: Option<&Notification>,
    ) {
        let Some(queue) = self.push.as_ref() else {
            debug!("Push delivery disabled");
            return;
        };
        if tokens.is_empty() {
            debug!(recipient = ?transition.recipient, "No FCM tokens for user");
            return;
        }

        let lead_id = lead.id.map(|id| id.to_hex()).unwrap_or_default();
        let mut message = PushMessage::new(transition.title, transition.message.clone())
            .with_data("type", transition.kind.as_str())
            .with_data("leadId", lead_id.clone())
            .with_data("leadName", lead.name.clone())
            .with_data("url", format!("/leads/{lead_id}"))
            .with_data("click_action", self.click_action.clone());
        if let Some(id) = notification.and_then(|n| n.id) {
            message = message.with_data("notificationId", id.to_hex());
        }

        queue.enqueue(PushJob {
            recipient: transition.recipient,
            tokens,
            message,
        });
    }
}
