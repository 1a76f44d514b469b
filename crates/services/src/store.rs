//! Persistence seams. MongoDB DAOs and the in-memory stores both implement
//! these, so the lifecycle logic never names a concrete backend.

use async_trait::async_trait;
use bson::oid::ObjectId;
use leadflow_db::models::{FcmToken, Lead, LeadStatus, Notification, NotificationPrefs, Role, User};

use crate::dao::base::{DaoResult, PaginatedResult, PaginationParams};

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Persists a new lead and returns it with its assigned id.
    async fn insert(&self, lead: &Lead) -> DaoResult<Lead>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Lead>;
    async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Lead>>;
    /// Overwrites the stored document. Fails with `NotFound` if it vanished.
    async fn save(&self, lead: &Lead) -> DaoResult<()>;
    async fn delete(&self, id: ObjectId) -> DaoResult<()>;
    async fn list(
        &self,
        query: &LeadQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Lead>>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> DaoResult<Notification>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Notification>;
    async fn mark_read(&self, id: ObjectId) -> DaoResult<()>;
    async fn mark_all_read(&self, recipient: ObjectId) -> DaoResult<u64>;
    async fn count_unread(&self, recipient: ObjectId) -> DaoResult<u64>;
    /// Newest first.
    async fn list_for_recipient(
        &self,
        recipient: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Notification>>;
    async fn delete_for_lead(&self, lead_id: ObjectId) -> DaoResult<u64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `DuplicateKey` when the email is taken.
    async fn insert(&self, user: &User) -> DaoResult<User>;
    async fn find_by_id(&self, id: ObjectId) -> DaoResult<User>;
    async fn find_by_email(&self, email: &str) -> DaoResult<User>;
    async fn list(&self, role: Option<Role>) -> DaoResult<Vec<User>>;
    async fn count(&self) -> DaoResult<u64>;
    async fn update_profile(&self, id: ObjectId, update: &ProfileUpdate) -> DaoResult<User>;
    async fn set_password_hash(&self, id: ObjectId, password_hash: String) -> DaoResult<()>;
    async fn set_preferences(&self, id: ObjectId, prefs: &NotificationPrefs) -> DaoResult<()>;
    async fn set_fcm_tokens(&self, id: ObjectId, tokens: &[FcmToken]) -> DaoResult<()>;
    async fn remove_fcm_tokens(&self, id: ObjectId, tokens: &[String]) -> DaoResult<()>;
    async fn delete(&self, id: ObjectId) -> DaoResult<()>;
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.role.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeadQuery {
    pub status: Option<LeadStatus>,
    pub assigned_to: Option<ObjectId>,
    /// Case-insensitive substring of name or company.
    pub search: Option<String>,
    pub sort: LeadSort,
}

impl LeadQuery {
    pub fn matches(&self, lead: &Lead) -> bool {
        if self.status.is_some_and(|s| s != lead.status) {
            return false;
        }
        if self.assigned_to.is_some() && self.assigned_to != lead.assigned_to {
            return false;
        }
        if let Some(needle) = self.search.as_deref().map(str::to_lowercase) {
            let hit = |field: Option<&str>| field.is_some_and(|v| v.to_lowercase().contains(&needle));
            if !hit(Some(&lead.name)) && !hit(lead.company.as_deref()) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadSortField {
    CreatedAt,
    UpdatedAt,
    Value,
    Name,
}

impl LeadSortField {
    pub fn key(&self) -> &'static str {
        match self {
            LeadSortField::CreatedAt => "createdAt",
            LeadSortField::UpdatedAt => "updatedAt",
            LeadSortField::Value => "value",
            LeadSortField::Name => "name",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeadSort {
    pub field: LeadSortField,
    pub descending: bool,
}

impl Default for LeadSort {
    fn default() -> Self {
        Self {
            field: LeadSortField::CreatedAt,
            descending: true,
        }
    }
}

impl LeadSort {
    /// Parses `field` or `-field`; unknown fields yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "createdAt" => LeadSortField::CreatedAt,
            "updatedAt" => LeadSortField::UpdatedAt,
            "value" => LeadSortField::Value,
            "name" => LeadSortField::Name,
            _ => return None,
        };
        Some(Self { field, descending })
    }

    pub fn compare(&self, a: &Lead, b: &Lead) -> std::cmp::Ordering {
        let ordering = match self.field {
            LeadSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            LeadSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            LeadSortField::Value => a.value.total_cmp(&b.value),
            LeadSortField::Name => a.name.cmp(&b.name),
        };
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}
