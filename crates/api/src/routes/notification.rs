use axum::{
    Json,
    extract::{Path, Query, State},
};
use leadflow_services::{dao::base::PaginatedResult, inbox::NotificationView};
use serde::Deserialize;

use crate::{
    error::{ApiError, parse_object_id},
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterTokenRequest {
    #[serde(default)]
    pub fcm_token: String,
    pub device_info: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveTokenRequest {
    pub fcm_token: String,
}

pub async fn list(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListQuery>,
) -> Result<Json<PaginatedResult<NotificationView>>, ApiError> {
    let result = state
        .inbox
        .list(&auth.actor(), query.page, query.limit)
        .await?;
    Ok(Json(result))
}

pub async fn unread_count(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let count = state.inbox.unread_count(&auth.actor()).await?;
    Ok(Json(serde_json::json!({ "count": count })))
}

pub async fn mark_read(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(notification_id): Path<String>,
) -> Result<Json<NotificationView>, ApiError> {
    let id = parse_object_id(&notification_id)?;
    let view = state.inbox.mark_read(id, &auth.actor()).await?;
    Ok(Json(view))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let modified = state.inbox.mark_all_read(&auth.actor()).await?;
    Ok(Json(serde_json::json!({ "modified": modified })))
}

pub async fn register_token(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<RegisterTokenRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let entry = state
        .tokens
        .register(auth.user_id, &body.fcm_token, body.device_info.as_deref())
        .await?;
    Ok(Json(serde_json::json!({
        "message": "FCM token registered",
        "deviceInfo": entry.device_info,
    })))
}

pub async fn remove_token(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<RemoveTokenRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.tokens.remove(auth.user_id, &body.fcm_token).await?;
    Ok(Json(serde_json::json!({ "message": "FCM token removed" })))
}
