use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};
use bson::oid::ObjectId;
use leadflow_db::models::Role;
use leadflow_services::Actor;
use leadflow_services::dao::base::DaoError;

use crate::{error::ApiError, state::AppState};

/// The authenticated user, from a bearer token or the `access_token` cookie.
/// The role is read from the store so demotions apply immediately.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: ObjectId,
    pub email: String,
    pub name: String,
    pub role: Role,
}

impl AuthUser {
    pub fn actor(&self) -> Actor {
        Actor::new(self.user_id, self.role)
    }
}

pub fn token_from_parts(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
        .or_else(|| {
            parts
                .headers
                .get(header::COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|cookies| {
                    cookies.split(';').find_map(|cookie| {
                        cookie
                            .trim()
                            .strip_prefix("access_token=")
                            .map(|s| s.to_string())
                    })
                })
        })
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);

        let token = token_from_parts(parts)
            .ok_or_else(|| ApiError::Unauthorized("No token provided".to_string()))?;
        let claims = app_state.auth.verify_access_token(&token)?;
        let user_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized("Invalid user ID in token".to_string()))?;

        let user = app_state.users.find_by_id(user_id).await.map_err(|e| match e {
            DaoError::NotFound => ApiError::Unauthorized("User no longer exists".to_string()),
            other => other.into(),
        })?;

        Ok(AuthUser {
            user_id,
            email: user.email,
            name: user.name,
            role: user.role,
        })
    }
}
