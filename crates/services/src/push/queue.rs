use bson::oid::ObjectId;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{deliver, PushGateway, PushMessage};
use crate::tokens::TokenRegistry;

#[derive(Debug, Clone)]
pub struct PushJob {
    pub recipient: ObjectId,
    pub tokens: Vec<String>,
    pub message: PushMessage,
}

/// Bounded at-most-once outbound queue drained by a single worker task.
/// A full queue drops the job.
pub struct PushQueue {
    sender: Mutex<Option<mpsc::Sender<PushJob>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl PushQueue {
    pub fn start(
        gateway: Arc<dyn PushGateway>,
        tokens: Arc<TokenRegistry>,
        capacity: usize,
        timeout: Duration,
    ) -> Self {
        let (sender, mut receiver) = mpsc::channel::<PushJob>(capacity.max(1));

        let worker = tokio::spawn(async move {
            while let Some(job) = receiver.recv().await {
                let delivery = deliver(gateway.as_ref(), &job.tokens, &job.message);
                let outcome = match tokio::time::timeout(timeout, delivery).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        warn!(recipient = ?job.recipient, ?timeout, "Push delivery timed out");
                        continue;
                    }
                };
                debug!(
                    recipient = ?job.recipient,
                    success_count = outcome.success_count,
                    failed = outcome.failed_tokens.len(),
                    "Push delivered"
                );
                if let Err(e) = tokens
                    .prune_failed_tokens(job.recipient, &outcome.failed_tokens)
                    .await
                {
                    error!(recipient = ?job.recipient, error = %e, "Failed to prune FCM tokens");
                }
            }
            info!("Push queue worker stopped");
        });

        Self {
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Returns false when the job was dropped.
    pub fn enqueue(&self, job: PushJob) -> bool {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            warn!(recipient = ?job.recipient, "Push queue is shut down, dropping job");
            return false;
        };
        match sender.try_send(job) {
            Ok(()) => true,
            Err(TrySendError::Full(job)) => {
                warn!(recipient = ?job.recipient, "Push queue full, dropping job");
                false
            }
            Err(TrySendError::Closed(job)) => {
                warn!(recipient = ?job.recipient, "Push queue closed, dropping job");
                false
            }
        }
    }

    /// Stops accepting jobs and waits for queued ones to drain.
    pub async fn shutdown(&self) {
        self.sender.lock().take();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                error!(error = %e, "Push queue worker panicked");
            }
        }
    }
}
