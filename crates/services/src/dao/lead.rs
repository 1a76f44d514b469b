use async_trait::async_trait;
use bson::{doc, oid::ObjectId, Document};
use leadflow_db::models::Lead;
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult, PaginatedResult, PaginationParams};
use crate::store::{LeadQuery, LeadStore};

pub struct LeadDao {
    pub base: BaseDao<Lead>,
}

impl LeadDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Lead::COLLECTION),
        }
    }

    fn filter(query: &LeadQuery) -> Document {
        let mut filter = Document::new();
        if let Some(status) = query.status {
            filter.insert("status", status.as_str());
        }
        if let Some(assignee) = query.assigned_to {
            filter.insert("assignedTo", assignee);
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let pattern = escape_regex(search.trim());
            filter.insert(
                "$or",
                vec![
                    doc! { "name": { "$regex": pattern.as_str(), "$options": "i" } },
                    doc! { "company": { "$regex": pattern.as_str(), "$options": "i" } },
                ],
            );
        }
        filter
    }
}

#[async_trait]
impl LeadStore for LeadDao {
    async fn insert(&self, lead: &Lead) -> DaoResult<Lead> {
        let id = self.base.insert_one(lead).await?;
        self.base.find_by_id(id).await
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Lead> {
        self.base.find_by_id(id).await
    }

    async fn find_by_ids(&self, ids: &[ObjectId]) -> DaoResult<Vec<Lead>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.base
            .find_many(doc! { "_id": { "$in": ids.to_vec() } }, None)
            .await
    }

    async fn save(&self, lead: &Lead) -> DaoResult<()> {
        let id = lead
            .id
            .ok_or_else(|| DaoError::Store("cannot save a lead without an id".to_string()))?;
        self.base.replace_by_id(id, lead).await
    }

    async fn delete(&self, id: ObjectId) -> DaoResult<()> {
        self.base.delete_by_id(id).await
    }

    async fn list(
        &self,
        query: &LeadQuery,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Lead>> {
        let direction = if query.sort.descending { -1 } else { 1 };
        let mut sort = Document::new();
        sort.insert(query.sort.field.key(), direction);
        sort.insert("_id", direction);
        self.base
            .find_paginated(Self::filter(query), Some(sort), params)
            .await
    }
}

fn escape_regex(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if "\\.+*?()|[]{}^$#&-~".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
