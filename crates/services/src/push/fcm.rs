use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{MulticastResponse, PushError, PushGateway, PushMessage};

const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Refresh the OAuth token this long before Google says it expires.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccount {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Firebase Cloud Messaging over the HTTP v1 API.
///
/// v1 has no batch endpoint, so multicast fans out one request per token.
pub struct FcmGateway {
    client: reqwest::Client,
    account: ServiceAccount,
    signing_key: EncodingKey,
    access_token: Mutex<Option<CachedToken>>,
}

impl FcmGateway {
    pub fn new(account: ServiceAccount) -> Result<Self, PushError> {
        let signing_key = EncodingKey::from_rsa_pem(account.private_key.as_bytes())
            .map_err(|e| PushError::Credentials(e.to_string()))?;
        info!(project_id = %account.project_id, "FCM gateway configured");
        Ok(Self {
            client: reqwest::Client::new(),
            account,
            signing_key,
            access_token: Mutex::new(None),
        })
    }

    pub fn from_file(path: &str) -> Result<Self, PushError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PushError::Credentials(format!("{path}: {e}")))?;
        let account: ServiceAccount =
            serde_json::from_str(&raw).map_err(|e| PushError::Credentials(e.to_string()))?;
        Self::new(account)
    }

    async fn access_token(&self) -> Result<String, PushError> {
        let mut cached = self.access_token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(token.value.clone());
            }
        }

        let now = Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: &self.account.client_email,
            scope: FCM_SCOPE,
            aud: &self.account.token_uri,
            iat: now,
            exp: now + 3600,
        };
        let assertion = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| PushError::Auth(e.to_string()))?;

        let response = self
            .client
            .post(&self.account.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Auth(format!("token exchange failed ({status}): {body}")));
        }
        let token: TokenResponse = response.json().await?;
        debug!(expires_in = token.expires_in, "Fetched FCM access token");

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(EXPIRY_MARGIN);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    async fn send_one(
        &self,
        access_token: &str,
        token: &str,
        message: &PushMessage,
    ) -> Result<(), PushError> {
        let url = format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.account.project_id
        );
        let response = self
            .client
            .post(url)
            .bearer_auth(access_token)
            .json(&v1_message(token, message))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error(status.as_u16(), &body))
    }
}

fn v1_message(token: &str, message: &PushMessage) -> Value {
    json!({ "message": message.to_payload(&[token.to_string()]) })
}

/// Maps an FCM v1 error response to a [`PushError`]. Only errors that
/// condemn the token itself become `InvalidToken`.
pub fn classify_error(status: u16, body: &str) -> PushError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let error = &parsed["error"];
    let message = error["message"].as_str().unwrap_or(body).to_string();
    let error_code = error["details"]
        .as_array()
        .into_iter()
        .flatten()
        .find_map(|d| d["errorCode"].as_str());

    match (status, error_code) {
        (_, Some("UNREGISTERED")) => PushError::InvalidToken,
        (400, Some("INVALID_ARGUMENT")) if message.to_lowercase().contains("registration token") => {
            PushError::InvalidToken
        }
        (401 | 403, _) => PushError::Auth(message),
        _ => PushError::Gateway { status, message },
    }
}

#[async_trait]
impl PushGateway for FcmGateway {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        let access_token = self.access_token().await?;
        self.send_one(&access_token, token, message).await
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastResponse, PushError> {
        let access_token = self.access_token().await?;
        let responses = join_all(
            tokens
                .iter()
                .map(|token| self.send_one(&access_token, token, message)),
        )
        .await;
        Ok(MulticastResponse { responses })
    }
}
