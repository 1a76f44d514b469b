//! Lead lifecycle: mutations on leads and their activities, and the
//! notifications those mutations fan out to.

pub mod dispatch;
pub mod patch;
pub mod transitions;

use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{Activity, Lead};
use std::sync::Arc;
use tracing::info;
use validator::Validate;

use crate::actor::Actor;
use crate::dao::base::{DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::store::{LeadQuery, LeadStore, NotificationStore, UserStore};

pub use dispatch::{NotificationDispatcher, NOTIFICATION_EVENT};
pub use patch::{ActivityInput, ActivityPatch, LeadInput, LeadPatch};
pub use transitions::{RequestedChange, Transition};

pub struct LeadOrchestrator {
    leads: Arc<dyn LeadStore>,
    users: Arc<dyn UserStore>,
    notifications: Arc<dyn NotificationStore>,
    dispatcher: NotificationDispatcher,
}

impl LeadOrchestrator {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        users: Arc<dyn UserStore>,
        notifications: Arc<dyn NotificationStore>,
        dispatcher: NotificationDispatcher,
    ) -> Self {
        Self {
            leads,
            users,
            notifications,
            dispatcher,
        }
    }

    pub async fn create(&self, mut input: LeadInput, actor: &Actor) -> DaoResult<Lead> {
        input.normalize();
        input.validate()?;
        if let Some(assignee) = input.assigned_to {
            self.ensure_user_exists(assignee).await?;
        }

        let now = DateTime::now();
        let mut lead = Lead {
            id: None,
            name: input.name,
            company: input.company,
            position: input.position,
            email: input.email,
            phone: input.phone,
            value: input.value.unwrap_or_default(),
            status: input.status.unwrap_or_default(),
            notes: input.notes,
            activities: Vec::new(),
            assigned_to: input.assigned_to,
            created_by: actor.id,
            suspect: None,
            prospect: None,
            lead_qualified: None,
            opportunity: None,
            deal: None,
            created_at: now,
            updated_at: now,
        };
        input.stages.apply(&mut lead)?;

        let lead = self.leads.insert(&lead).await?;
        info!(lead_id = ?lead.id, by = ?actor.id, "Lead created");

        if let Some(transition) = transitions::on_create(&lead, actor.id) {
            self.dispatcher.dispatch(&lead, transition).await;
        }
        Ok(lead)
    }

    pub async fn get(&self, id: ObjectId, actor: &Actor) -> DaoResult<Lead> {
        let lead = self.leads.find_by_id(id).await?;
        let visible = actor.is_admin()
            || lead.assigned_to == Some(actor.id)
            || lead.created_by == actor.id;
        if !visible {
            return Err(DaoError::Forbidden(
                "Not authorized to access this lead".to_string(),
            ));
        }
        Ok(lead)
    }

    /// Non-admins only ever see leads assigned to them.
    pub async fn list(
        &self,
        mut query: LeadQuery,
        params: &PaginationParams,
        actor: &Actor,
    ) -> DaoResult<PaginatedResult<Lead>> {
        if !actor.is_admin() {
            query.assigned_to = Some(actor.id);
        }
        self.leads.list(&query, params).await
    }

    pub async fn update(&self, id: ObjectId, mut patch: LeadPatch, actor: &Actor) -> DaoResult<Lead> {
        let before = self.load_modifiable(id, actor).await?;
        patch.normalize();
        patch.validate()?;
        if let Some(Some(assignee)) = patch.assigned_to {
            self.ensure_user_exists(assignee).await?;
        }

        let requested = RequestedChange {
            status: patch.status,
            assigned_to: patch.assigned_to,
        };
        let mut after = before.clone();
        patch.apply(&mut after)?;
        after.updated_at = DateTime::now();
        self.leads.save(&after).await?;

        for transition in transitions::on_update(&before, &after, requested, actor.id) {
            self.dispatcher.dispatch(&after, transition).await;
        }
        Ok(after)
    }

    /// Admin only; the role check happens before the store is touched.
    pub async fn delete(&self, id: ObjectId, actor: &Actor) -> DaoResult<()> {
        if !actor.is_admin() {
            return Err(DaoError::Forbidden("Only admins can delete leads".to_string()));
        }
        self.leads.delete(id).await?;
        let removed = self.notifications.delete_for_lead(id).await?;
        info!(lead_id = ?id, by = ?actor.id, notifications = removed, "Lead deleted");
        Ok(())
    }

    pub async fn add_activity(
        &self,
        lead_id: ObjectId,
        input: ActivityInput,
        actor: &Actor,
    ) -> DaoResult<Lead> {
        let mut lead = self.load_modifiable(lead_id, actor).await?;
        input.validate()?;

        let now = DateTime::now();
        let activity = Activity {
            id: ObjectId::new(),
            activity_type: input.activity_type,
            description: input.description.trim().to_string(),
            due_date: input.due_date.map(DateTime::from_chrono),
            completed: input.completed,
            completed_at: input.completed.then_some(now),
            created_by: actor.id,
            created_at: now,
        };
        let transition = transitions::on_activity(&lead, &activity, actor.id);
        lead.activities.push(activity);
        lead.updated_at = now;
        self.leads.save(&lead).await?;

        self.dispatcher.dispatch(&lead, transition).await;
        Ok(lead)
    }

    pub async fn update_activity(
        &self,
        lead_id: ObjectId,
        activity_id: ObjectId,
        patch: ActivityPatch,
        actor: &Actor,
    ) -> DaoResult<Lead> {
        let mut lead = self.load_modifiable(lead_id, actor).await?;
        patch.validate()?;

        let now = DateTime::now();
        let activity = lead.activity_mut(activity_id).ok_or(DaoError::NotFound)?;
        if let Some(description) = patch.description {
            activity.description = description.trim().to_string();
        }
        if let Some(due) = patch.due_date {
            activity.due_date = Some(DateTime::from_chrono(due));
        }
        match patch.completed {
            Some(true) if !activity.completed => {
                activity.completed = true;
                activity.completed_at = Some(now);
            }
            Some(false) => {
                activity.completed = false;
                activity.completed_at = None;
            }
            _ => {}
        }
        lead.updated_at = now;
        self.leads.save(&lead).await?;
        Ok(lead)
    }

    pub async fn delete_activity(
        &self,
        lead_id: ObjectId,
        activity_id: ObjectId,
        actor: &Actor,
    ) -> DaoResult<Lead> {
        let mut lead = self.load_modifiable(lead_id, actor).await?;
        let before = lead.activities.len();
        lead.activities.retain(|a| a.id != activity_id);
        if lead.activities.len() == before {
            return Err(DaoError::NotFound);
        }
        lead.updated_at = DateTime::now();
        self.leads.save(&lead).await?;
        Ok(lead)
    }

    /// Unassigned leads are open to anyone; assigned ones to the assignee
    /// and admins.
    async fn load_modifiable(&self, id: ObjectId, actor: &Actor) -> DaoResult<Lead> {
        let lead = self.leads.find_by_id(id).await?;
        match lead.assigned_to {
            Some(assignee) if assignee != actor.id && !actor.is_admin() => Err(
                DaoError::Forbidden("Not authorized to update this lead".to_string()),
            ),
            _ => Ok(lead),
        }
    }

    async fn ensure_user_exists(&self, user_id: ObjectId) -> DaoResult<()> {
        match self.users.find_by_id(user_id).await {
            Ok(_) => Ok(()),
            Err(DaoError::NotFound) => Err(DaoError::Validation(format!(
                "assignedTo: no user with id {user_id}"
            ))),
            Err(e) => Err(e),
        }
    }
}
