use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::FcmToken;
use std::sync::Arc;
use tracing::{debug, info};

use crate::dao::base::{DaoError, DaoResult};
use crate::store::UserStore;

/// Device tokens per user. One live device per user: registering a token
/// replaces whatever was there.
pub struct TokenRegistry {
    users: Arc<dyn UserStore>,
}

impl TokenRegistry {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    pub async fn register(
        &self,
        user_id: ObjectId,
        token: &str,
        device_info: Option<&str>,
    ) -> DaoResult<FcmToken> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DaoError::Validation("FCM token is required".to_string()));
        }
        // surfaces NotFound before touching the token set
        self.users.find_by_id(user_id).await?;

        let entry = FcmToken {
            token: token.to_string(),
            device_info: device_info
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or("Unknown Device")
                .to_string(),
            last_used: DateTime::now(),
        };
        self.users
            .set_fcm_tokens(user_id, std::slice::from_ref(&entry))
            .await?;
        info!(?user_id, device = %entry.device_info, "FCM token registered");
        Ok(entry)
    }

    pub async fn remove(&self, user_id: ObjectId, token: &str) -> DaoResult<()> {
        self.users
            .remove_fcm_tokens(user_id, &[token.to_string()])
            .await?;
        debug!(?user_id, "FCM token removed");
        Ok(())
    }

    /// Drops tokens the push gateway rejected. Called from the push worker.
    pub async fn prune_failed_tokens(
        &self,
        user_id: ObjectId,
        failed_tokens: &[String],
    ) -> DaoResult<()> {
        if failed_tokens.is_empty() {
            return Ok(());
        }
        self.users.remove_fcm_tokens(user_id, failed_tokens).await?;
        info!(?user_id, pruned = failed_tokens.len(), "Pruned invalid FCM tokens");
        Ok(())
    }
}
