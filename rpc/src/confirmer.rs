//! Background confirmation of broadcast transactions.
//!
//! The broadcast handler pushes a [`ConfirmationJob`] onto the
//! [`ConfirmationQueue`] and returns immediately. The [`ConfirmationWorker`]
//! polls each signature until it is finalized or fails on chain, then moves
//! the stored history record to `confirmed` or `failed`. A job that times
//! out leaves its record `pending`; `pending` records are re-enqueued at
//! start-up by [`ConfirmationWorker::resume_pending`].

use devflation_chain::{Commitment, SolanaRpc};
use devflation_store::{HistoryStore, PendingEntry, StoreError};
use devflation_types::{BurnStatus, Timestamp};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::metrics::ApiMetrics;
use crate::shutdown::ShutdownSignal;

/// A transaction whose history record waits for finalization.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfirmationJob {
    pub pubkey: String,
    pub mint: String,
    pub txid: String,
}

impl From<PendingEntry> for ConfirmationJob {
    fn from(entry: PendingEntry) -> Self {
        Self {
            pubkey: entry.pubkey,
            mint: entry.mint,
            txid: entry.txid,
        }
    }
}

/// Sending half of the worker's job channel.
#[derive(Clone, Debug)]
pub struct ConfirmationQueue {
    tx: mpsc::UnboundedSender<ConfirmationJob>,
}

impl ConfirmationQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ConfirmationJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Returns `false` when the worker has stopped.
    pub fn enqueue(&self, job: ConfirmationJob) -> bool {
        self.tx.send(job).is_ok()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfirmationResult {
    Confirmed,
    /// On-chain error, rendered as JSON.
    Failed(String),
    TimedOut,
}

pub struct ConfirmationWorker {
    chain: Arc<dyn SolanaRpc>,
    store: Arc<dyn HistoryStore>,
    interval: Duration,
    timeout: Duration,
    metrics: Option<Arc<ApiMetrics>>,
}

impl ConfirmationWorker {
    pub fn new(
        chain: Arc<dyn SolanaRpc>,
        store: Arc<dyn HistoryStore>,
        interval: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            chain,
            store,
            interval,
            timeout,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<ApiMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Queue every `pending` record found in the store.
    pub async fn resume_pending(&self, queue: &ConfirmationQueue) -> Result<usize, StoreError> {
        let pending = self.store.pending().await?;
        let count = pending.len();
        for entry in pending {
            queue.enqueue(entry.into());
        }
        if count > 0 {
            info!(count, "resuming confirmations of pending burns");
        }
        Ok(count)
    }

    /// Consume jobs until the channel closes or shutdown is signalled.
    ///
    /// Jobs still polling at shutdown are dropped; their records stay
    /// `pending` and are picked up by the next `resume_pending`.
    pub async fn run(
        self,
        mut jobs: mpsc::UnboundedReceiver<ConfirmationJob>,
        mut shutdown: ShutdownSignal,
    ) {
        let worker = Arc::new(self);
        let mut tasks = JoinSet::new();

        loop {
            tokio::select! {
                job = jobs.recv() => match job {
                    Some(job) => {
                        let worker = worker.clone();
                        tasks.spawn(async move { worker.confirm(job).await });
                    }
                    None => break,
                },
                _ = shutdown.requested() => {
                    info!(in_flight = tasks.len(), "confirmation worker stopping");
                    tasks.abort_all();
                    return;
                }
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}
    }

    /// Wait for one transaction and persist the outcome.
    pub async fn confirm(&self, job: ConfirmationJob) -> ConfirmationResult {
        if let Some(m) = &self.metrics {
            m.confirmations_in_flight.inc();
        }
        let result = self.wait_for_finality(&job.txid).await;
        if let Some(m) = &self.metrics {
            m.confirmations_in_flight.dec();
        }

        let status = match &result {
            ConfirmationResult::Confirmed => {
                info!(txid = %job.txid, owner = %job.pubkey, mint = %job.mint, "burn finalized");
                self.count(|m| m.confirmations_confirmed.inc());
                BurnStatus::Confirmed
            }
            ConfirmationResult::Failed(err) => {
                warn!(txid = %job.txid, owner = %job.pubkey, error = %err, "burn failed on chain");
                self.count(|m| m.confirmations_failed.inc());
                BurnStatus::Failed
            }
            ConfirmationResult::TimedOut => {
                warn!(txid = %job.txid, owner = %job.pubkey, "gave up waiting for finalization, record stays pending");
                self.count(|m| m.confirmations_timed_out.inc());
                return result;
            }
        };

        match self
            .store
            .update_status(&job.pubkey, &job.mint, &job.txid, status, Timestamp::now())
            .await
        {
            Ok(true) => {}
            Ok(false) => debug!(txid = %job.txid, "history record was replaced by a newer burn"),
            Err(e) => {
                tracing::error!(txid = %job.txid, owner = %job.pubkey, error = %e, "failed to update burn history");
                self.count(|m| m.history_write_failures.inc());
            }
        }
        result
    }

    /// Poll the signature status until finalized, failed or timed out.
    /// Query errors are retried on the next tick.
    pub async fn wait_for_finality(&self, txid: &str) -> ConfirmationResult {
        let deadline = Instant::now() + self.timeout;
        loop {
            match self.chain.signature_status(txid).await {
                Ok(Some(status)) => {
                    if let Some(err) = status.error_detail() {
                        return ConfirmationResult::Failed(err);
                    }
                    if status.reached(Commitment::Finalized) {
                        return ConfirmationResult::Confirmed;
                    }
                }
                Ok(None) => {}
                Err(e) => debug!(%txid, error = %e, "signature status query failed"),
            }
            if Instant::now() + self.interval > deadline {
                return ConfirmationResult::TimedOut;
            }
            tokio::time::sleep(self.interval).await;
        }
    }

    fn count(&self, f: impl FnOnce(&ApiMetrics)) {
        if let Some(m) = &self.metrics {
            f(m);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownController;
    use devflation_nullables::{failed_status, status, NullChain, NullHistoryStore};
    use devflation_types::{BurnHistoryRecord, Metadata};

    fn worker(chain: &Arc<NullChain>, store: &Arc<NullHistoryStore>) -> ConfirmationWorker {
        ConfirmationWorker::new(
            chain.clone(),
            store.clone(),
            Duration::from_millis(1),
            Duration::from_millis(50),
        )
    }

    async fn pending(store: &NullHistoryStore, mint: &str, txid: &str) -> ConfirmationJob {
        store
            .upsert(BurnHistoryRecord::pending("Owner", mint, txid, Metadata::new(), Timestamp::now()))
            .await
            .unwrap();
        ConfirmationJob {
            pubkey: "Owner".into(),
            mint: mint.into(),
            txid: txid.into(),
        }
    }

    #[tokio::test]
    async fn finalized_transaction_is_confirmed() {
        let chain = Arc::new(NullChain::new());
        let store = Arc::new(NullHistoryStore::new());
        let job = pending(&store, "Mint", "sig").await;
        chain.script_statuses(
            "sig",
            vec![Ok(None), Ok(Some(status(Commitment::Confirmed))), Ok(Some(status(Commitment::Finalized)))],
        );

        let result = worker(&chain, &store).confirm(job).await;

        assert_eq!(result, ConfirmationResult::Confirmed);
        let record = store.record("Owner", "Mint").unwrap();
        assert_eq!(record.status, BurnStatus::Confirmed);
        assert!(record.updated_at.is_some());
    }

    #[tokio::test]
    async fn on_chain_error_marks_record_failed() {
        let chain = Arc::new(NullChain::new());
        let store = Arc::new(NullHistoryStore::new());
        let job = pending(&store, "Mint", "sig").await;
        chain.set_status("sig", failed_status(serde_json::json!("InsufficientFundsForFee")));

        let result = worker(&chain, &store).confirm(job).await;

        assert_eq!(result, ConfirmationResult::Failed("\"InsufficientFundsForFee\"".into()));
        assert_eq!(store.record("Owner", "Mint").unwrap().status, BurnStatus::Failed);
    }

    #[tokio::test]
    async fn timeout_leaves_record_pending() {
        let chain = Arc::new(NullChain::new());
        let store = Arc::new(NullHistoryStore::new());
        let job = pending(&store, "Mint", "sig").await;
        let metrics = Arc::new(ApiMetrics::new());

        let result = worker(&chain, &store)
            .with_metrics(metrics.clone())
            .confirm(job)
            .await;

        assert_eq!(result, ConfirmationResult::TimedOut);
        assert_eq!(store.record("Owner", "Mint").unwrap().status, BurnStatus::Pending);
        assert_eq!(metrics.confirmations_timed_out.get(), 1);
        assert_eq!(metrics.confirmations_in_flight.get(), 0);
    }

    #[tokio::test]
    async fn older_attempt_does_not_touch_newer_burn() {
        let chain = Arc::new(NullChain::new());
        let store = Arc::new(NullHistoryStore::new());
        let old = pending(&store, "Mint", "old-sig").await;
        pending(&store, "Mint", "new-sig").await;
        chain.set_status("old-sig", status(Commitment::Finalized));

        worker(&chain, &store).confirm(old).await;

        let record = store.record("Owner", "Mint").unwrap();
        assert_eq!(record.txid.as_deref(), Some("new-sig"));
        assert_eq!(record.status, BurnStatus::Pending);
    }

    #[tokio::test]
    async fn pending_records_are_resumed_and_processed() {
        let chain = Arc::new(NullChain::new());
        let store = Arc::new(NullHistoryStore::new());
        pending(&store, "A", "sig-a").await;
        pending(&store, "B", "sig-b").await;
        chain.set_status("sig-a", status(Commitment::Finalized));
        chain.set_status("sig-b", status(Commitment::Finalized));

        let (queue, jobs) = ConfirmationQueue::channel();
        let w = worker(&chain, &store);
        assert_eq!(w.resume_pending(&queue).await.unwrap(), 2);
        drop(queue);

        let shutdown = ShutdownController::new();
        w.run(jobs, shutdown.subscribe()).await;

        assert_eq!(store.record("Owner", "A").unwrap().status, BurnStatus::Confirmed);
        assert_eq!(store.record("Owner", "B").unwrap().status, BurnStatus::Confirmed);
    }

    #[tokio::test]
    async fn shutdown_stops_the_worker() {
        let chain = Arc::new(NullChain::new());
        let store = Arc::new(NullHistoryStore::new());
        let job = pending(&store, "Mint", "sig").await;
        let w = ConfirmationWorker::new(chain.clone(), store.clone(), Duration::from_secs(1), Duration::from_secs(600));

        let (queue, jobs) = ConfirmationQueue::channel();
        let shutdown = ShutdownController::new();
        let running = tokio::spawn(w.run(jobs, shutdown.subscribe()));
        assert!(queue.enqueue(job));
        while chain.status_calls("sig") == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        shutdown.shutdown();

        tokio::time::timeout(Duration::from_secs(1), running).await.unwrap().unwrap();
        assert_eq!(store.record("Owner", "Mint").unwrap().status, BurnStatus::Pending);
    }
}
