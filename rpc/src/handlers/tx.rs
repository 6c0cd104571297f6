//! `/api/tx/*`: blockhash, broadcast and history.

use axum::extract::{Query, State};
use axum::Json;
use devflation_chain::Commitment;
use devflation_store::StoreError;
use devflation_types::{BroadcastRequest, BroadcastResponse, HistoryResponse, RecentBlockhash};
use serde::Deserialize;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::state::AppState;

pub async fn recent_blockhash(State(state): State<AppState>) -> Result<Json<RecentBlockhash>, ApiError> {
    state
        .chain
        .latest_blockhash(Commitment::Finalized)
        .await
        .map(Json)
        .map_err(|e| {
            error!(error = %e, "failed to fetch blockhash");
            ApiError::Internal("Failed to fetch blockhash")
        })
}

/// A body that is missing or not JSON is treated like a missing payload.
pub async fn broadcast(
    State(state): State<AppState>,
    body: Option<Json<BroadcastRequest>>,
) -> Result<Json<BroadcastResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    crate::broadcast::broadcast(&state, req).await.map(Json)
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub pubkey: Option<String>,
}

pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let pubkey = query
        .pubkey
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::BadRequest("pubkey query required"))?;

    match state.store.read_all(&pubkey).await {
        Ok(burns) => Ok(Json(HistoryResponse { burns })),
        Err(StoreError::InvalidKey(_)) => Err(ApiError::BadRequest("invalid pubkey")),
        Err(StoreError::Corruption(detail)) => {
            warn!(owner = %pubkey, %detail, "unreadable history file, returning empty history");
            Ok(Json(HistoryResponse::default()))
        }
        Err(e) => {
            error!(owner = %pubkey, error = %e, "failed to read history");
            Err(ApiError::Internal("Failed to read history"))
        }
    }
}
