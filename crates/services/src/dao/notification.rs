use async_trait::async_trait;
use bson::{doc, oid::ObjectId};
use leadflow_db::models::Notification;
use mongodb::Database;

use super::base::{BaseDao, DaoResult, PaginatedResult, PaginationParams};
use crate::store::NotificationStore;

pub struct NotificationDao {
    pub base: BaseDao<Notification>,
}

impl NotificationDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, Notification::COLLECTION),
        }
    }
}

#[async_trait]
impl NotificationStore for NotificationDao {
    async fn insert(&self, notification: &Notification) -> DaoResult<Notification> {
        let id = self.base.insert_one(notification).await?;
        self.base.find_by_id(id).await
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<Notification> {
        self.base.find_by_id(id).await
    }

    async fn mark_read(&self, id: ObjectId) -> DaoResult<()> {
        self.base
            .update_by_id(id, doc! { "$set": { "read": true } })
            .await?;
        Ok(())
    }

    async fn mark_all_read(&self, recipient: ObjectId) -> DaoResult<u64> {
        self.base
            .update_many(
                doc! { "recipient": recipient, "read": false },
                doc! { "$set": { "read": true } },
            )
            .await
    }

    async fn count_unread(&self, recipient: ObjectId) -> DaoResult<u64> {
        self.base
            .count(doc! { "recipient": recipient, "read": false })
            .await
    }

    async fn list_for_recipient(
        &self,
        recipient: ObjectId,
        params: &PaginationParams,
    ) -> DaoResult<PaginatedResult<Notification>> {
        self.base
            .find_paginated(
                doc! { "recipient": recipient },
                Some(doc! { "createdAt": -1, "_id": -1 }),
                params,
            )
            .await
    }

    async fn delete_for_lead(&self, lead_id: ObjectId) -> DaoResult<u64> {
        self.base.hard_delete(doc! { "relatedLead": lead_id }).await
    }
}
