//! Retry coordinator: blockhash, sign, broadcast, and at most one re-sign
//! when the cluster no longer knows the blockhash.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use devflation_types::{BroadcastErrorKind, BroadcastRequest, Metadata};
use solana_sdk::hash::Hash;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::api::TxApi;
use crate::builder::UnsignedTransaction;
use crate::error::WalletError;
use crate::signing::{sign_with, SignOutcome, WalletAdapter, SIGNATURE_CANCELLED_NOTICE, UNSUPPORTED_WALLET_NOTICE};

/// Automatic re-signs after `blockhash_not_found`.
pub const MAX_BLOCKHASH_RETRIES: u32 = 1;

/// Fields sent with every broadcast of one burn.
#[derive(Clone, Debug, Default)]
pub struct SubmitContext {
    pub pubkey: String,
    pub mint: String,
    pub metadata: Option<Metadata>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    Success { txid: String, attempts: u32 },
    UserRejected,
    Unsupported,
    SigningFailed(String),
    TerminalFailure {
        kind: BroadcastErrorKind,
        detail: String,
        attempts: u32,
    },
}

impl SubmitOutcome {
    pub fn txid(&self) -> Option<&str> {
        match self {
            SubmitOutcome::Success { txid, .. } => Some(txid),
            _ => None,
        }
    }

    /// User-facing text for every outcome except success.
    pub fn notice(&self) -> Option<String> {
        match self {
            SubmitOutcome::Success { .. } => None,
            SubmitOutcome::UserRejected => Some(SIGNATURE_CANCELLED_NOTICE.to_string()),
            SubmitOutcome::Unsupported => Some(UNSUPPORTED_WALLET_NOTICE.to_string()),
            SubmitOutcome::SigningFailed(detail) => Some(detail.clone()),
            SubmitOutcome::TerminalFailure { detail, .. } => Some(detail.clone()),
        }
    }
}

pub struct RetryCoordinator {
    api: Arc<dyn TxApi>,
    max_retries: u32,
}

impl RetryCoordinator {
    pub fn new(api: Arc<dyn TxApi>) -> Self {
        Self {
            api,
            max_retries: MAX_BLOCKHASH_RETRIES,
        }
    }

    /// Sign and broadcast `tx`, refreshing its blockhash before each signature.
    ///
    /// Only `Err` for local failures (serialization, a malformed blockhash);
    /// everything the wallet or the network does is a `SubmitOutcome`.
    pub async fn submit(
        &self,
        wallet: &dyn WalletAdapter,
        tx: &mut UnsignedTransaction,
        ctx: &SubmitContext,
    ) -> Result<SubmitOutcome, WalletError> {
        let mut retries = 0;
        let mut attempts = 0;

        loop {
            if let Err(detail) = self.refresh_blockhash(tx).await? {
                return Ok(SubmitOutcome::TerminalFailure {
                    kind: BroadcastErrorKind::NetworkError,
                    detail,
                    attempts,
                });
            }

            let signed = match sign_with(wallet, tx.to_transaction()?).await {
                SignOutcome::Signed(signed) => signed,
                SignOutcome::UserRejected => return Ok(SubmitOutcome::UserRejected),
                SignOutcome::Unsupported => return Ok(SubmitOutcome::Unsupported),
                SignOutcome::Failed(detail) => return Ok(SubmitOutcome::SigningFailed(detail)),
            };
            let bytes = bincode::serialize(&signed).map_err(|e| WalletError::Serialization(e.to_string()))?;
            let req = BroadcastRequest {
                signed_tx_base64: Some(STANDARD.encode(bytes)),
                pubkey: Some(ctx.pubkey.clone()),
                mint: Some(ctx.mint.clone()),
                metadata: ctx.metadata.clone(),
            };

            attempts += 1;
            debug!(attempt = attempts, mint = %ctx.mint, "broadcasting signed transaction");
            match self.api.broadcast(&req).await {
                Ok(txid) => {
                    info!(%txid, attempts, "burn transaction broadcast");
                    return Ok(SubmitOutcome::Success { txid, attempts });
                }
                Err(failure) if failure.kind.is_retryable() && retries < self.max_retries => {
                    retries += 1;
                    info!(detail = %failure.detail, "blockhash expired, signing again with a fresh one");
                }
                Err(failure) => {
                    warn!(kind = %failure.kind, detail = %failure.detail, attempts, "broadcast failed");
                    return Ok(SubmitOutcome::TerminalFailure {
                        kind: failure.kind,
                        detail: failure.detail,
                        attempts,
                    });
                }
            }
        }
    }

    /// Inner `Err` carries a fetch failure to report when `tx` has no
    /// blockhash to fall back on.
    async fn refresh_blockhash(&self, tx: &mut UnsignedTransaction) -> Result<Result<(), String>, WalletError> {
        match self.api.recent_blockhash().await {
            Ok(latest) => {
                let hash = Hash::from_str(&latest.blockhash)
                    .map_err(|_| WalletError::Api(format!("invalid blockhash: {}", latest.blockhash)))?;
                tx.set_blockhash(hash);
                Ok(Ok(()))
            }
            Err(e) if tx.recent_blockhash().is_some() => {
                warn!(error = %e, "blockhash refresh failed, reusing the previous one");
                Ok(Ok(()))
            }
            Err(e) => Ok(Err(e.to_string())),
        }
    }
}
