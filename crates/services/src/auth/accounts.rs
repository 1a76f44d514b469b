use bson::{oid::ObjectId, DateTime};
use leadflow_db::models::{NotificationPrefs, Role, User};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationError};

use super::{AuthError, AuthService, TokenPair};
use crate::actor::Actor;
use crate::dao::base::DaoError;
use crate::store::{ProfileUpdate, UserStore};

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Dao(#[from] DaoError),
    #[error("Cannot delete your own account")]
    SelfDeletion,
}

impl From<validator::ValidationErrors> for AccountError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AccountError::Dao(errors.into())
    }
}

pub type AccountResult<T> = Result<T, AccountError>;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Shared by registration, admin-created accounts and password changes.
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    let len = password.chars().count();
    if (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&len) {
        Ok(())
    } else {
        let mut error = ValidationError::new("password_length");
        error.message = Some(
            format!("password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters").into(),
        );
        Err(error)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProfilePatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub in_app: Option<ChannelPrefsPatch>,
    pub push: Option<ChannelPrefsPatch>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPrefsPatch {
    pub lead_updates: Option<bool>,
    pub lead_assignments: Option<bool>,
    pub follow_ups: Option<bool>,
}

impl PreferencesPatch {
    pub fn apply(&self, prefs: &mut NotificationPrefs) {
        if let Some(patch) = self.in_app {
            patch.apply(&mut prefs.in_app);
        }
        if let Some(patch) = self.push {
            patch.apply(&mut prefs.push);
        }
    }
}

impl ChannelPrefsPatch {
    fn apply(&self, channel: &mut leadflow_db::models::ChannelPrefs) {
        if let Some(v) = self.lead_updates {
            channel.lead_updates = v;
        }
        if let Some(v) = self.lead_assignments {
            channel.lead_assignments = v;
        }
        if let Some(v) = self.follow_ups {
            channel.follow_ups = v;
        }
    }
}

/// Registration, login and user administration on top of [`AuthService`].
pub struct AccountService {
    auth: Arc<AuthService>,
    users: Arc<dyn UserStore>,
}

impl AccountService {
    pub fn new(auth: Arc<AuthService>, users: Arc<dyn UserStore>) -> Self {
        Self { auth, users }
    }

    /// Self-service signup. The first account in an empty store becomes admin.
    pub async fn register(&self, input: NewAccount) -> AccountResult<(User, TokenPair)> {
        input.validate()?;
        let role = if self.users.count().await? == 0 {
            Role::Admin
        } else {
            Role::Sales
        };
        let user = self.insert_user(input, role).await?;
        let tokens = self.tokens_for(&user)?;
        Ok((user, tokens))
    }

    pub async fn create_user(&self, actor: &Actor, input: NewAccount) -> AccountResult<User> {
        if !actor.is_admin() {
            return Err(DaoError::Forbidden("Only admins can create users".to_string()).into());
        }
        input.validate()?;
        let role = input.role.unwrap_or_default();
        self.insert_user(input, role).await
    }

    async fn insert_user(&self, input: NewAccount, role: Role) -> AccountResult<User> {
        let password_hash = self.auth.hash_password(&input.password)?;
        let now = DateTime::now();
        let user = User {
            id: None,
            name: input.name.trim().to_string(),
            email: input.email.trim().to_lowercase(),
            password_hash,
            role,
            fcm_tokens: Vec::new(),
            notification_preferences: NotificationPrefs::default(),
            created_at: now,
            updated_at: now,
        };
        let user = self.users.insert(&user).await?;
        info!(user_id = ?user.id, ?role, "User registered");
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> AccountResult<(User, TokenPair)> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await
            .map_err(|e| match e {
                DaoError::NotFound => AccountError::Auth(AuthError::InvalidCredentials),
                other => other.into(),
            })?;

        if !self.auth.verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        let tokens = self.tokens_for(&user)?;
        Ok((user, tokens))
    }

    pub async fn refresh(&self, refresh_token: &str) -> AccountResult<TokenPair> {
        let claims = self.auth.verify_refresh_token(refresh_token)?;
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| AuthError::InvalidToken("Invalid user ID in token".to_string()))?;
        let user = self.users.find_by_id(user_id).await.map_err(|e| match e {
            DaoError::NotFound => AccountError::Auth(AuthError::InvalidCredentials),
            other => other.into(),
        })?;
        self.tokens_for(&user)
    }

    pub async fn change_password(
        &self,
        actor: &Actor,
        current: &str,
        new_password: &str,
    ) -> AccountResult<()> {
        validate_password(new_password)
            .map_err(|e| DaoError::Validation(e.to_string()))?;
        let user = self.users.find_by_id(actor.id).await?;
        if !self.auth.verify_password(current, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }
        let hash = self.auth.hash_password(new_password)?;
        self.users.set_password_hash(actor.id, hash).await?;
        Ok(())
    }

    pub async fn get_user(&self, actor: &Actor, user_id: ObjectId) -> AccountResult<User> {
        if !actor.is_self_or_admin(user_id) {
            return Err(DaoError::Forbidden("Not authorized to access this user".to_string()).into());
        }
        Ok(self.users.find_by_id(user_id).await?)
    }

    pub async fn list_users(&self, actor: &Actor) -> AccountResult<Vec<User>> {
        if !actor.is_admin() {
            return Err(DaoError::Forbidden("Only admins can list users".to_string()).into());
        }
        Ok(self.users.list(None).await?)
    }

    pub async fn list_sales(&self) -> AccountResult<Vec<User>> {
        Ok(self.users.list(Some(Role::Sales)).await?)
    }

    /// Role changes from non-admins are dropped rather than rejected.
    pub async fn update_user(
        &self,
        actor: &Actor,
        user_id: ObjectId,
        patch: ProfilePatch,
    ) -> AccountResult<User> {
        if !actor.is_self_or_admin(user_id) {
            return Err(DaoError::Forbidden("Not authorized to update this user".to_string()).into());
        }
        patch.validate()?;

        let update = ProfileUpdate {
            name: patch.name.map(|n| n.trim().to_string()),
            email: patch.email.map(|e| e.trim().to_lowercase()),
            role: patch.role.filter(|_| actor.is_admin()),
        };
        Ok(self.users.update_profile(user_id, &update).await?)
    }

    pub async fn update_preferences(
        &self,
        actor: &Actor,
        user_id: ObjectId,
        patch: PreferencesPatch,
    ) -> AccountResult<NotificationPrefs> {
        if actor.id != user_id {
            return Err(DaoError::Forbidden("Not authorized to update this user".to_string()).into());
        }
        let user = self.users.find_by_id(user_id).await?;
        let mut prefs = user.notification_preferences;
        patch.apply(&mut prefs);
        self.users.set_preferences(user_id, &prefs).await?;
        Ok(prefs)
    }

    pub async fn delete_user(&self, actor: &Actor, user_id: ObjectId) -> AccountResult<()> {
        if !actor.is_admin() {
            return Err(DaoError::Forbidden("Only admins can delete users".to_string()).into());
        }
        if actor.id == user_id {
            return Err(AccountError::SelfDeletion);
        }
        self.users.delete(user_id).await?;
        info!(?user_id, by = ?actor.id, "User deleted");
        Ok(())
    }

    fn tokens_for(&self, user: &User) -> AccountResult<TokenPair> {
        let id = user.id.ok_or(DaoError::NotFound)?;
        Ok(self.auth.generate_tokens(id, &user.email, &user.name)?)
    }
}
