//! Confirmation poller: watches one signature until it settles.
//!
//! Advisory only. The server's own confirmation worker decides what the
//! history says; this loop just drives the status shown to the user.

use devflation_chain::{Commitment, SolanaRpc};
use devflation_types::{BurnMethod, TxStatus};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info};

pub const TIMEOUT_MESSAGE: &str = "Timeout waiting for confirmation";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    /// 60 polls 2 s apart, about two minutes.
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed,
    /// The chain reported an error; JSON of the error object.
    Failed(String),
    /// No terminal status within the attempt ceiling. The transaction may
    /// still land.
    Timeout,
}

impl PollOutcome {
    pub fn to_status(&self, txid: &str, method: BurnMethod) -> TxStatus {
        match self {
            PollOutcome::Confirmed => TxStatus::confirmed(txid, method),
            PollOutcome::Failed(detail) => TxStatus::failed(txid, method, detail.clone()),
            PollOutcome::Timeout => TxStatus::failed(txid, method, TIMEOUT_MESSAGE),
        }
    }
}

#[derive(Clone)]
pub struct ConfirmationPoller {
    chain: Arc<dyn SolanaRpc>,
    config: PollerConfig,
}

impl ConfirmationPoller {
    pub fn new(chain: Arc<dyn SolanaRpc>, config: PollerConfig) -> Self {
        Self { chain, config }
    }

    pub fn config(&self) -> PollerConfig {
        self.config
    }

    /// Poll until a terminal status or the attempt ceiling.
    ///
    /// Query errors count as an attempt and are otherwise ignored.
    pub async fn poll(&self, txid: &str) -> PollOutcome {
        let max_attempts = self.config.max_attempts.max(1);
        for attempt in 1..=max_attempts {
            match self.chain.signature_status(txid).await {
                Ok(Some(status)) => {
                    if let Some(detail) = status.error_detail() {
                        info!(%txid, attempt, %detail, "transaction failed on chain");
                        return PollOutcome::Failed(detail);
                    }
                    if status.reached(Commitment::Confirmed) {
                        info!(%txid, attempt, "transaction confirmed");
                        return PollOutcome::Confirmed;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(%txid, attempt, error = %e, "signature status query failed"),
            }
            if attempt < max_attempts {
                tokio::time::sleep(self.config.interval).await;
            }
        }
        info!(%txid, attempts = max_attempts, "gave up waiting for confirmation");
        PollOutcome::Timeout
    }

    /// Poll on a background task.
    pub fn start(&self, txid: impl Into<String>) -> PollHandle {
        let poller = self.clone();
        let txid = txid.into();
        PollHandle {
            task: Some(tokio::spawn(async move { poller.poll(&txid).await })),
        }
    }
}

/// A running poll. Dropping the handle stops the poll.
pub struct PollHandle {
    task: Option<JoinHandle<PollOutcome>>,
}

impl PollHandle {
    pub fn abort_handle(&self) -> Option<AbortHandle> {
        self.task.as_ref().map(|t| t.abort_handle())
    }

    pub fn cancel(&self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Wait for the result; `None` if the poll was cancelled.
    pub async fn outcome(mut self) -> Option<PollOutcome> {
        let task = self.task.take()?;
        task.await.ok()
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}
