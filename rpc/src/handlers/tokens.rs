//! Wallet read endpoints: SPL token list and SOL balance.
//!
//! Both answer with `Cache-Control: no-store`.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use devflation_chain::ChainError;
use devflation_types::{BalanceResponse, TokensResponse};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::state::AppState;

const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

#[derive(Debug, Deserialize)]
pub struct WalletQuery {
    #[serde(rename = "publicKey")]
    pub public_key: Option<String>,
}

impl WalletQuery {
    fn require(self) -> Result<String, ApiError> {
        self.public_key
            .filter(|k| !k.is_empty())
            .ok_or(ApiError::BadRequest("Missing or invalid publicKey"))
    }
}

fn no_store(result: Result<impl IntoResponse, ApiError>) -> Response {
    ([(header::CACHE_CONTROL, "no-store")], result).into_response()
}

fn upstream_error(e: ChainError, fallback: &'static str) -> ApiError {
    match e {
        ChainError::Rpc { code, message } => ApiError::Upstream {
            error: "Solana RPC error",
            details: json!({ "code": code, "message": message }),
        },
        ChainError::InvalidResponse(detail) => ApiError::Upstream {
            error: fallback,
            details: json!(detail),
        },
        other => ApiError::Upstream {
            error: "RPC request failed",
            details: json!(other.to_string()),
        },
    }
}

pub async fn solana_tokens(State(state): State<AppState>, Query(query): Query<WalletQuery>) -> Response {
    no_store(tokens(&state, query).await)
}

async fn tokens(state: &AppState, query: WalletQuery) -> Result<Json<TokensResponse>, ApiError> {
    let owner = query.require()?;
    let accounts = state.chain.token_accounts_by_owner(&owner).await.map_err(|e| {
        tracing::warn!(%owner, error = %e, "token account lookup failed");
        upstream_error(e, "Failed to fetch tokens")
    })?;
    let tokens = state.oracle.token_views(accounts).await;
    Ok(Json(TokensResponse { tokens }))
}

pub async fn solana_balance(State(state): State<AppState>, Query(query): Query<WalletQuery>) -> Response {
    no_store(balance(&state, query).await)
}

async fn balance(state: &AppState, query: WalletQuery) -> Result<Json<BalanceResponse>, ApiError> {
    let owner = query.require()?;
    let lamports = state.chain.balance(&owner).await.map_err(|e| {
        tracing::warn!(%owner, error = %e, "balance lookup failed");
        upstream_error(e, "Failed to fetch balance")
    })?;
    Ok(Json(BalanceResponse {
        sol: lamports as f64 / LAMPORTS_PER_SOL,
    }))
}
