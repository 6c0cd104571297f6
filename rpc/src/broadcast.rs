//! Broadcast service: submit a signed transaction, record it, queue its
//! confirmation.

use base64::Engine;
use devflation_types::{
    BroadcastErrorKind, BroadcastRequest, BroadcastResponse, BurnHistoryRecord, Timestamp, UNKNOWN,
};
use tracing::{error, info, warn};

use crate::confirmer::ConfirmationJob;
use crate::error::ApiError;
use crate::state::AppState;

/// Classify an RPC refusal. Any mention of the blockhash means the client
/// should re-sign with a fresh one.
pub fn classify_rpc_error(detail: &str) -> BroadcastErrorKind {
    if detail.to_lowercase().contains("blockhash") {
        BroadcastErrorKind::BlockhashNotFound
    } else {
        BroadcastErrorKind::RpcError
    }
}

/// Submit `req` and write exactly one history record for its
/// `(pubkey, mint)`, whether the chain accepts it or not.
///
/// A missing `pubkey` or `mint` is stored as `"unknown"`; the mint falls back
/// to `metadata.mint` first. A `pubkey` the store cannot key is refused before
/// anything reaches the chain. History write failures are logged and never
/// change the response.
pub async fn broadcast(state: &AppState, req: BroadcastRequest) -> Result<BroadcastResponse, ApiError> {
    let encoded = req
        .signed_tx_base64
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::BadRequest("signedTxBase64 missing"))?;
    let raw = base64::engine::general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|e| ApiError::BroadcastFailed(format!("invalid base64 payload: {e}")))?;

    let metadata = req.metadata.unwrap_or_default();
    let pubkey = req
        .pubkey
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let mint = req
        .mint
        .filter(|m| !m.is_empty())
        .or_else(|| metadata.get("mint").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| UNKNOWN.to_string());

    state.store.validate_key(&pubkey).map_err(|e| {
        warn!(owner = %pubkey, error = %e, "refusing broadcast for unusable wallet key");
        ApiError::BadRequest("invalid pubkey")
    })?;

    match state.chain.send_raw_transaction(&raw).await {
        Ok(txid) => {
            info!(%txid, owner = %pubkey, %mint, "transaction accepted");
            state.count(|m| m.broadcasts.inc());

            let record = BurnHistoryRecord::pending(&pubkey, &mint, &txid, metadata, Timestamp::now());
            persist(state, record).await;

            let job = ConfirmationJob {
                pubkey,
                mint,
                txid: txid.clone(),
            };
            if !state.confirmations.enqueue(job) {
                warn!(%txid, "confirmation worker is not running, record stays pending");
            }
            Ok(BroadcastResponse { txid })
        }
        Err(e) => {
            let detail = e.detail();
            warn!(owner = %pubkey, %mint, %detail, "RPC refused transaction");

            let record = BurnHistoryRecord::failed(&pubkey, &mint, &detail, metadata, Timestamp::now());
            persist(state, record).await;

            match classify_rpc_error(&detail) {
                BroadcastErrorKind::BlockhashNotFound => {
                    state.count(|m| m.broadcasts_blockhash_expired.inc());
                    Err(ApiError::BlockhashExpired(detail))
                }
                _ => {
                    state.count(|m| m.broadcasts_rejected.inc());
                    Err(ApiError::BroadcastRejected(detail))
                }
            }
        }
    }
}

async fn persist(state: &AppState, record: BurnHistoryRecord) {
    let owner = record.pubkey.clone();
    if let Err(e) = state.store.upsert(record).await {
        error!(%owner, error = %e, "failed to write burn history");
        state.count(|m| m.history_write_failures.inc());
    }
}
