//! One burn, end to end: build, sign and broadcast with retry, then poll.

use devflation_chain::SolanaRpc;
use devflation_types::{Metadata, TxStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::api::TxApi;
use crate::builder::{BurnRequest, TransactionBuilder};
use crate::error::WalletError;
use crate::poller::{ConfirmationPoller, PollOutcome, PollerConfig, TIMEOUT_MESSAGE};
use crate::retry::{RetryCoordinator, SubmitContext, SubmitOutcome};
use crate::signing::{WalletAdapter, SIGNATURE_CANCELLED_NOTICE, UNSUPPORTED_WALLET_NOTICE};
use crate::status::StatusBoard;

fn default_api_url() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_poll_attempts() -> u32 {
    60
}

fn default_wait() -> bool {
    true
}

/// Client-side settings for the burn pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Used for the incinerator account check and for polling.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
    /// Return right after the broadcast instead of polling.
    #[serde(default = "default_wait")]
    pub wait_for_confirmation: bool,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            rpc_url: default_rpc_url(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            wait_for_confirmation: default_wait(),
        }
    }
}

impl FlowConfig {
    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            max_attempts: self.max_poll_attempts,
        }
    }
}

/// How a burn ended, from the user's point of view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BurnReport {
    /// Broadcast, then polled to a terminal outcome.
    Finished { txid: String, outcome: PollOutcome },
    /// Broadcast; confirmation was not awaited.
    Submitted { txid: String },
    /// The status was dismissed while polling.
    Dismissed { txid: String },
    Cancelled,
    Unsupported,
    Failed { detail: String },
}

impl BurnReport {
    pub fn txid(&self) -> Option<&str> {
        match self {
            BurnReport::Finished { txid, .. }
            | BurnReport::Submitted { txid }
            | BurnReport::Dismissed { txid } => Some(txid),
            _ => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            BurnReport::Finished {
                txid,
                outcome: PollOutcome::Confirmed,
            } => format!("Burn confirmed: {txid}"),
            BurnReport::Finished {
                txid,
                outcome: PollOutcome::Failed(detail),
            } => format!("Burn {txid} failed on chain: {detail}"),
            BurnReport::Finished {
                txid,
                outcome: PollOutcome::Timeout,
            } => format!("{TIMEOUT_MESSAGE} ({txid}); it may still confirm"),
            BurnReport::Submitted { txid } | BurnReport::Dismissed { txid } => {
                format!("Burn submitted: {txid}")
            }
            BurnReport::Cancelled => SIGNATURE_CANCELLED_NOTICE.to_string(),
            BurnReport::Unsupported => UNSUPPORTED_WALLET_NOTICE.to_string(),
            BurnReport::Failed { detail } => detail.clone(),
        }
    }
}

/// Clears the in-progress flag when a burn ends, however it ends.
struct InProgress<'a>(&'a AtomicBool);

impl<'a> InProgress<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, WalletError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| WalletError::BurnInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct BurnFlow {
    builder: TransactionBuilder,
    coordinator: RetryCoordinator,
    poller: ConfirmationPoller,
    board: Arc<StatusBoard>,
    wait_for_confirmation: bool,
    in_progress: AtomicBool,
}

impl BurnFlow {
    pub fn new(chain: Arc<dyn SolanaRpc>, api: Arc<dyn TxApi>, config: &FlowConfig) -> Self {
        Self {
            builder: TransactionBuilder::new(Arc::clone(&chain)),
            coordinator: RetryCoordinator::new(api),
            poller: ConfirmationPoller::new(chain, config.poller()),
            board: Arc::new(StatusBoard::new()),
            wait_for_confirmation: config.wait_for_confirmation,
            in_progress: AtomicBool::new(false),
        }
    }

    pub fn board(&self) -> Arc<StatusBoard> {
        Arc::clone(&self.board)
    }

    pub fn is_busy(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Run one burn. One burn at a time per flow.
    ///
    /// `Err` means the burn never reached the wallet (bad request, wrong
    /// wallet, or a local build failure).
    pub async fn run(
        &self,
        wallet: &dyn WalletAdapter,
        req: &BurnRequest,
        metadata: Option<Metadata>,
    ) -> Result<BurnReport, WalletError> {
        if !req.acknowledged {
            return Err(WalletError::NotAcknowledged);
        }
        let _guard = InProgress::acquire(&self.in_progress)?;

        let connected = wallet.public_key().ok_or(WalletError::NotConnected)?;
        if connected != req.owner {
            return Err(WalletError::OwnerMismatch {
                connected: connected.to_string(),
                owner: req.owner.to_string(),
            });
        }

        self.board.dismiss();
        let mut tx = self.builder.build(req).await?;
        let ctx = SubmitContext {
            pubkey: req.owner.to_string(),
            mint: req.mint.to_string(),
            metadata,
        };

        let txid = match self.coordinator.submit(wallet, &mut tx, &ctx).await? {
            SubmitOutcome::Success { txid, .. } => txid,
            SubmitOutcome::UserRejected => return Ok(BurnReport::Cancelled),
            SubmitOutcome::Unsupported => return Ok(BurnReport::Unsupported),
            SubmitOutcome::SigningFailed(detail) | SubmitOutcome::TerminalFailure { detail, .. } => {
                warn!(mint = %req.mint, %detail, "burn failed");
                return Ok(BurnReport::Failed { detail });
            }
        };

        self.board.set(TxStatus::pending(&txid, req.method));
        if !self.wait_for_confirmation {
            return Ok(BurnReport::Submitted { txid });
        }

        let handle = self.poller.start(&txid);
        if let Some(abort) = handle.abort_handle() {
            self.board.track(abort);
        }
        match handle.outcome().await {
            Some(outcome) => {
                self.board.set(outcome.to_status(&txid, req.method));
                Ok(BurnReport::Finished { txid, outcome })
            }
            None => {
                info!(%txid, "confirmation polling dismissed");
                Ok(BurnReport::Dismissed { txid })
            }
        }
    }
}
