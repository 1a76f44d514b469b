use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use leadflow_db::models::{NotificationPrefs, Role, User};
use leadflow_services::auth::accounts::{NewAccount, PreferencesPatch, ProfilePatch};
use serde::{Deserialize, Serialize};

use crate::{
    error::{ApiError, parse_object_id},
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub notification_preferences: NotificationPrefs,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            name: user.name,
            email: user.email,
            role: user.role,
            notification_preferences: user.notification_preferences,
            created_at: user.created_at.try_to_rfc3339_string().unwrap_or_default(),
            updated_at: user.updated_at.try_to_rfc3339_string().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SalesRepResponse {
    pub id: String,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.accounts.list_users(&auth.actor()).await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

pub async fn list_sales(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<SalesRepResponse>>, ApiError> {
    let reps = state.accounts.list_sales().await?;
    Ok(Json(
        reps.into_iter()
            .map(|u| SalesRepResponse {
                id: u.id.map(|id| id.to_hex()).unwrap_or_default(),
                name: u.name,
                email: u.email,
            })
            .collect(),
    ))
}

pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = state
        .accounts
        .create_user(
            &auth.actor(),
            NewAccount {
                name: body.name,
                email: body.email,
                password: body.password,
                role: body.role,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

pub async fn get(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let uid = parse_object_id(&user_id)?;
    let user = state.accounts.get_user(&auth.actor(), uid).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<ProfilePatch>,
) -> Result<Json<UserResponse>, ApiError> {
    let uid = parse_object_id(&user_id)?;
    let user = state.accounts.update_user(&auth.actor(), uid, body).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let uid = parse_object_id(&user_id)?;
    state.accounts.delete_user(&auth.actor(), uid).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

pub async fn update_preferences(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<String>,
    ApiJson(body): ApiJson<PreferencesPatch>,
) -> Result<Json<NotificationPrefs>, ApiError> {
    let uid = parse_object_id(&user_id)?;
    let prefs = state
        .accounts
        .update_preferences(&auth.actor(), uid, body)
        .await?;
    Ok(Json(prefs))
}
