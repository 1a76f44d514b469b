//! Recording doubles for the push gateway and realtime broadcaster, shared by
//! unit tests and the end-to-end harness.

use async_trait::async_trait;
use bson::oid::ObjectId;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Notify;

use crate::push::{MulticastResponse, PushError, PushGateway, PushMessage};
use crate::realtime::Broadcaster;

#[derive(Debug, Clone)]
pub struct RecordedPush {
    pub tokens: Vec<String>,
    pub multicast: bool,
    pub message: PushMessage,
    pub payload: Value,
}

#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<RecordedPush>>,
    invalid_tokens: HashSet<String>,
    failing: bool,
    notify: Notify,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tokens the gateway reports as unregistered.
    pub fn with_invalid_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.invalid_tokens.extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Every call fails with a transport error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn sent(&self) -> Vec<RecordedPush> {
        self.sent.lock().clone()
    }

    /// Waits until at least `count` sends were recorded or `timeout` passes.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<RecordedPush> {
        let _ = tokio::time::timeout(timeout, async {
            loop {
                let notified = self.notify.notified();
                if self.sent.lock().len() >= count {
                    return;
                }
                notified.await;
            }
        })
        .await;
        self.sent()
    }

    fn record(&self, tokens: &[String], multicast: bool, message: &PushMessage) {
        self.sent.lock().push(RecordedPush {
            tokens: tokens.to_vec(),
            multicast,
            message: message.clone(),
            payload: message.to_payload(tokens),
        });
        self.notify.notify_waiters();
    }

    fn result_for(&self, token: &str) -> Result<(), PushError> {
        if self.failing {
            Err(PushError::Transport("connection refused".to_string()))
        } else if self.invalid_tokens.contains(token) {
            Err(PushError::InvalidToken)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send(&self, token: &str, message: &PushMessage) -> Result<(), PushError> {
        self.record(&[token.to_string()], false, message);
        self.result_for(token)
    }

    async fn send_multicast(
        &self,
        tokens: &[String],
        message: &PushMessage,
    ) -> Result<MulticastResponse, PushError> {
        self.record(tokens, true, message);
        if self.failing {
            return Err(PushError::Transport("connection refused".to_string()));
        }
        Ok(MulticastResponse {
            responses: tokens.iter().map(|t| self.result_for(t)).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Emitted {
    pub room: ObjectId,
    pub event: String,
    pub payload: Value,
}

#[derive(Default)]
pub struct RecordingBroadcaster {
    emitted: Mutex<Vec<Emitted>>,
}

impl RecordingBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emitted(&self) -> Vec<Emitted> {
        self.emitted.lock().clone()
    }

    pub fn emitted_to(&self, room: ObjectId) -> Vec<Emitted> {
        self.emitted().into_iter().filter(|e| e.room == room).collect()
    }
}

#[async_trait]
impl Broadcaster for RecordingBroadcaster {
    async fn emit(&self, room: ObjectId, event: &str, payload: Value) {
        self.emitted.lock().push(Emitted {
            room,
            event: event.to_string(),
            payload,
        });
    }
}
