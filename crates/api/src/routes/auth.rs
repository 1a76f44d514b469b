use axum::{
    Json,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
};
use leadflow_services::auth::TokenPair;
use leadflow_services::auth::accounts::NewAccount;
use serde::{Deserialize, Serialize};

use super::user::UserResponse;
use crate::{
    error::ApiError,
    extractors::{auth::AuthUser, json::ApiJson},
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: u64,
    pub user: UserResponse,
}

impl AuthResponse {
    fn new(tokens: TokenPair, user: UserResponse) -> Self {
        Self {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_in: tokens.expires_in,
            user,
        }
    }
}

fn session_cookie(tokens: &TokenPair) -> Result<HeaderMap, ApiError> {
    let cookie = format!(
        "access_token={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        tokens.access_token, tokens.expires_in
    );
    let value = HeaderValue::from_str(&cookie)
        .map_err(|e| ApiError::Internal(format!("invalid cookie header: {e}")))?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

pub async fn register(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, HeaderMap, Json<AuthResponse>), ApiError> {
    let (user, tokens) = state
        .accounts
        .register(NewAccount {
            name: body.name,
            email: body.email,
            password: body.password,
            role: None,
        })
        .await?;

    let headers = session_cookie(&tokens)?;
    Ok((
        StatusCode::CREATED,
        headers,
        Json(AuthResponse::new(tokens, UserResponse::from(user))),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> Result<(HeaderMap, Json<AuthResponse>), ApiError> {
    let (user, tokens) = state.accounts.login(&body.email, &body.password).await?;
    let headers = session_cookie(&tokens)?;
    Ok((headers, Json(AuthResponse::new(tokens, UserResponse::from(user)))))
}

pub async fn refresh(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> Result<(HeaderMap, Json<TokenPair>), ApiError> {
    let tokens = state.accounts.refresh(&body.refresh_token).await?;
    let headers = session_cookie(&tokens)?;
    Ok((headers, Json(tokens)))
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.accounts.get_user(&auth.actor(), auth.user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(body): ApiJson<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state
        .accounts
        .change_password(&auth.actor(), &body.current_password, &body.new_password)
        .await?;
    Ok(Json(serde_json::json!({ "updated": true })))
}
