use async_trait::async_trait;
use bson::{doc, oid::ObjectId, DateTime, Document};
use leadflow_db::models::{FcmToken, NotificationPrefs, Role, User};
use mongodb::Database;

use super::base::{BaseDao, DaoError, DaoResult};
use crate::store::{ProfileUpdate, UserStore};

pub struct UserDao {
    pub base: BaseDao<User>,
}

impl UserDao {
    pub fn new(db: &Database) -> Self {
        Self {
            base: BaseDao::new(db, User::COLLECTION),
        }
    }

    async fn set_fields(&self, id: ObjectId, mut fields: Document) -> DaoResult<()> {
        fields.insert("updatedAt", DateTime::now());
        self.base.update_by_id(id, doc! { "$set": fields }).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for UserDao {
    async fn insert(&self, user: &User) -> DaoResult<User> {
        let id = self.base.insert_one(user).await?;
        self.base.find_by_id(id).await
    }

    async fn find_by_id(&self, id: ObjectId) -> DaoResult<User> {
        self.base.find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> DaoResult<User> {
        self.base
            .find_one(doc! { "email": email.to_lowercase() })
            .await?
            .ok_or(DaoError::NotFound)
    }

    async fn list(&self, role: Option<Role>) -> DaoResult<Vec<User>> {
        let filter = match role {
            Some(role) => doc! { "role": bson::to_bson(&role)? },
            None => doc! {},
        };
        self.base.find_many(filter, Some(doc! { "name": 1 })).await
    }

    async fn count(&self) -> DaoResult<u64> {
        self.base.count(doc! {}).await
    }

    async fn update_profile(&self, id: ObjectId, update: &ProfileUpdate) -> DaoResult<User> {
        let mut fields = Document::new();
        if let Some(ref name) = update.name {
            fields.insert("name", name.clone());
        }
        if let Some(ref email) = update.email {
            fields.insert("email", email.to_lowercase());
        }
        if let Some(role) = update.role {
            fields.insert("role", bson::to_bson(&role)?);
        }

        if !fields.is_empty() {
            fields.insert("updatedAt", DateTime::now());
            self.base
                .update_by_id(id, doc! { "$set": fields })
                .await?;
        }

        self.base.find_by_id(id).await
    }

    async fn set_password_hash(&self, id: ObjectId, password_hash: String) -> DaoResult<()> {
        self.set_fields(id, doc! { "passwordHash": password_hash }).await
    }

    async fn set_preferences(&self, id: ObjectId, prefs: &NotificationPrefs) -> DaoResult<()> {
        self.set_fields(id, doc! { "notificationPreferences": bson::to_bson(prefs)? })
            .await
    }

    async fn set_fcm_tokens(&self, id: ObjectId, tokens: &[FcmToken]) -> DaoResult<()> {
        self.set_fields(id, doc! { "fcmTokens": bson::to_bson(tokens)? })
            .await
    }

    async fn remove_fcm_tokens(&self, id: ObjectId, tokens: &[String]) -> DaoResult<()> {
        self.base
            .update_by_id(
                id,
                doc! {
                    "$pull": { "fcmTokens": { "token": { "$in": tokens.to_vec() } } },
                    "$set": { "updatedAt": DateTime::now() },
                },
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: ObjectId) -> DaoResult<()> {
        self.base.delete_by_id(id).await
    }
}
