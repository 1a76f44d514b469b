//! Best-effort device push delivery.

pub mod fcm;
pub mod queue;

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

pub use fcm::FcmGateway;
pub use queue::{PushJob, PushQueue};

#[derive(Debug, Error)]
pub enum PushError {
    /// The gateway no longer recognises the token (unregistered or malformed).
    #[error("Invalid registration token")]
    InvalidToken,
    #[error("Push gateway returned {status}: {message}")]
    Gateway { status: u16, message: String },
    #[error("Push transport error: {0}")]
    Transport(String),
    #[error("Push auth error: {0}")]
    Auth(String),
    #[error("Push credentials error: {0}")]
    Credentials(String),
}

impl PushError {
    pub fn is_token_invalid(&self) -> bool {
        matches!(self, PushError::InvalidToken)
    }
}

impl From<reqwest::Error> for PushError {
    fn from(e: reqwest::Error) -> Self {
        PushError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    /// String-only, as device payload data must be.
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: BTreeMap::new(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Gateway-neutral payload: `{notification, data, token | tokens}`.
    pub fn to_payload(&self, tokens: &[String]) -> Value {
        let mut payload = json!({
            "notification": { "title": self.title, "body": self.body },
            "data": self.data,
        });
        match tokens {
            [single] => payload["token"] = json!(single),
            many => payload["tokens"] = json!(many),
        }
        payload
    }
}

#[derive(Debug, Default)]
pub struct MulticastResponse {
    /// One entry per input token, in input order.
    pub responses: Vec<Result<(), PushError>>,
}

impl MulticastResponse {
    pub fn success_count(&self) -> usize {
        self.responses.iter().filter(|r| r.is_ok()).count()
    }
}

#[async_trait]
pub trait PushGateway: Send + Sync {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError>;

    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastResponse, PushError>;
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PushOutcome {
    pub success_count: usize,
    /// Tokens the gateway rejected as invalid; safe to prune.
    pub failed_tokens: Vec<String>,
}

/// Sends `message` to every token, picking single or multicast by count.
/// Never fails: gateway errors collapse into a zero-success outcome.
pub async fn deliver(
    gateway: &dyn PushGateway,
    tokens: &[String],
    message: &PushMessage,
) -> PushOutcome {
    match tokens {
        [] => {
            debug!("No device tokens, skipping push");
            PushOutcome::default()
        }
        [token] => match gateway.send(token, message).await {
            Ok(()) => PushOutcome {
                success_count: 1,
                failed_tokens: Vec::new(),
            },
            Err(e) => {
                warn!(error = %e, "Push send failed");
                PushOutcome {
                    success_count: 0,
                    failed_tokens: if e.is_token_invalid() {
                        vec![token.clone()]
                    } else {
                        Vec::new()
                    },
                }
            }
        },
        many => match gateway.send_multicast(many, message).await {
            Ok(response) => {
                let failed_tokens: Vec<String> = many
                    .iter()
                    .zip(&response.responses)
                    .filter(|(_, r)| r.as_ref().is_err_and(PushError::is_token_invalid))
                    .map(|(t, _)| t.clone())
                    .collect();
                let success_count = response.success_count();
                if success_count < many.len() {
                    warn!(
                        success_count,
                        failure_count = many.len() - success_count,
                        "Push multicast partially failed"
                    );
                }
                PushOutcome {
                    success_count,
                    failed_tokens,
                }
            }
            Err(e) => {
                warn!(error = %e, tokens = many.len(), "Push multicast failed");
                PushOutcome::default()
            }
        },
    }
}
