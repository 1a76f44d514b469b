//! In-process stores selected by a `memory://` database URL. Nothing is
//! persisted across restarts.

use async_trait::async_trait;
use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{FcmToken, Lead, Notification, NotificationPrefs, Role, User};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::dao::base::{DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::store::{LeadQuery, LeadStore, NotificationStore, ProfileUpdate, UserStore};

fn paginate<T: Clone>(items: Vec<T>, params: &PaginationParams) -> PaginatedResult<T> {
    let params = params.normalized();
    let total = items.len() as u64;
    let page = items
        .into_iter()
        .skip(usize::try_from(params.skip()).unwrap_or(usize::MAX))
        .take(params.per_page as usize)
        .collect();
    PaginatedResult::new(page, total, &params)
}

#[derive(Default)]
pub struct MemoryLeadStore {
    leads: RwLock<HashMap<ObjectId, Lead>>,
}

impl MemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LeadStore for MemoryLeadStore {
    async fn insert(&self, lead: &Lead) -> DaoResult<Lead> {
        let mut stored = lead.clone();
        let id = ObjectId::new();
        stored.id = Some(id);
        self.leads.write().insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Lead> {
        self.leads.read().get(&id).cloned().ok_or(DaoError::NotFound)
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Lead>> {
        let leads = self.leads.read();
        Ok(ids.iter().filter_map(|id| leads.get(id).cloned()).collect())
    }

    async fn save(&self, lead: &Lead) -> DaoResult<()> {
        let id = lead
            .id
            .ok_or_else(|| DaoError::Store("cannot save a lead without an id".to_string()))?;
        let mut leads = self.leads.write();
        match leads.get_mut(&id) {
            Some(slot) => {
                *slot = lead.clone();
                Ok(())
            }
            None => Err(DaoError::NotFound),
        }
    }

    async fn delete(&self, id: ObjectId) -> DaoResult<()> {
        self.leads
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(DaoError::NotFound)
    }

    async fn list(
        &self,
        query: &LeadQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Lead>> {
        let mut matching: Vec<Lead> = self
            .leads
            .read()
            .values()
            .filter(|lead| query.matches(lead))
            .cloned()
            .collect();
        matching.sort_by(|a, b| query.sort.compare(a, b).then_with(|| {
            let ids = a.id.cmp(&b.id);
            if query.sort.descending { ids.reverse() } else { ids }
        }));
        Ok(paginate(matching, params))
    }
}

#[derive(Default)]
pub struct MemoryNotificationStore {
    notifications: RwLock<HashMap<ObjectId, Notification>>,
}

impl MemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored notification, oldest first.
    pub fn all(&self) -> Vec<Notification> {
        let mut all: Vec<Notification> = self.notifications.read().values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        all
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> DaoResult<Notification> {
        let mut stored = notification.clone();
        let id = ObjectId::new();
        stored.id = Some(id);
        self.notifications.write().insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Notification> {
        self.notifications
            .read()
            .get(&id)
            .cloned()
            .ok_or(DaoError::NotFound)
    }

    async fn mark_read(&self, id: ObjectId) -> DaoResult<()> {
        let mut notifications = self.notifications.write();
        let notification = notifications.get_mut(&id).ok_or(DaoError::NotFound)?;
        notification.read = true;
        Ok(())
    }

    async fn mark_all_read(&self, recipient: ObjectId) -> DaoResult<u64> {
        let mut modified = 0;
        for notification in self.notifications.write().values_mut() {
            if notification.recipient == recipient && !notification.read {
                notification.read = true;
                modified += 1;
            }
        }
        Ok(modified)
    }

    async fn count_unread(&self, recipient: ObjectId) -> DaoResult<u64> {
        Ok(self
            .notifications
            .read()
            .values()
            .filter(|n| n.recipient == recipient && !n.read)
            .count() as u64)
    }

    async fn list_for_recipient(
        &self,
        recipient: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Notification>> {
        let mut matching: Vec<Notification> = self
            .all()
            .into_iter()
            .filter(|n| n.recipient == recipient)
            .collect();
        matching.reverse();
        Ok(paginate(matching, params))
    }

    async fn delete_for_lead(&self, lead_id: ObjectId) -> DaoResult<u64> {
        let mut notifications = self.notifications.write();
        let before = notifications.len();
        notifications.retain(|_, n| n.related_lead != Some(lead_id));
        Ok((before - notifications.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<ObjectId, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_user<R>(&self, id: ObjectId, f: impl FnOnce(&mut User) -> R) -> DaoResult<R> {
        let mut users = self.users.write();
        let user = users.get_mut(&id).ok_or(DaoError::NotFound)?;
        let result = f(user);
        user.updated_at = DateTime::now();
        Ok(result)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, user: &User) -> DaoResult<User> {
        let mut users = self.users.write();
        let email = user.email.to_lowercase();
        if users.values().any(|u| u.email == email) {
            return Err(DaoError::DuplicateKey(format!("email {email} already registered")));
        }
        let mut stored = user.clone();
        let id = ObjectId::new();
        stored.id = Some(id);
        stored.email = email;
        users.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<User> {
        self.users.read().get(&id).cloned().ok_or(DaoError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        let email = email.to_lowercase();
        self.users
            .read()
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(DaoError::NotFound)
    }

    async fn list(&self, role: Option<Role>) -> DaoResult<Vec<User>> {
        let mut users: Vec<User> = self
            .users
            .read()
            .values()
            .filter(|u| role.is_none_or(|r| u.role == r))
            .cloned()
            .collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn count(&self) -> DaoResult<u64> {
        Ok(self.users.read().len() as u64)
    }

    async fn update_profile(&self, id: ObjectId, update: &ProfileUpdate) -> DaoResult<User> {
        let mut users = self.users.write();
        if let Some(ref email) = update.email {
            let email = email.to_lowercase();
            if users.iter().any(|(other, u)| *other != id && u.email == email) {
                return Err(DaoError::DuplicateKey(format!("email {email} already registered")));
            }
        }
        let user = users.get_mut(&id).ok_or(DaoError::NotFound)?;
        if let Some(ref name) = update.name {
            user.name = name.clone();
        }
        if let Some(ref email) = update.email {
            user.email = email.to_lowercase();
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        if !update.is_empty() {
            user.updated_at = DateTime::now();
        }
        Ok(user.clone())
    }

    async fn set_password_hash(&self, id: ObjectId, password_hash: String) -> DaoResult<()> {
        self.with_user(id, |u| u.password_hash = password_hash)
    }

    async fn set_preferences(&self, id: ObjectId, prefs: &NotificationPrefs) -> DaoResult<()> {
        self.with_user(id, |u| u.notification_preferences = *prefs)
    }

    async fn set_fcm_tokens(&self, id: ObjectId, tokens: &[FcmToken]) -> DaoResult<()> {
        self.with_user(id, |u| u.fcm_tokens = tokens.to_vec())
    }

    async fn remove_fcm_tokens(&self, id: ObjectId, tokens: &[String]) -> DaoResult<()> {
        self.with_user(id, |u| u.fcm_tokens.retain(|t| !tokens.contains(&t.token)))
    }

    async fn delete(&self, id: ObjectId) -> DaoResult<()> {
        self.users
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or(DaoError::NotFound)
    }
}
