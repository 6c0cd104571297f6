//! HTTP API error types.
//!
//! [`ApiError`] carries the exact status code and JSON body each endpoint
//! answers with; [`ServerError`] covers start-up failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use devflation_types::api::BLOCKHASH_NOT_FOUND;
use devflation_types::ErrorBody;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400 with a fixed message.
    #[error("{0}")]
    BadRequest(&'static str),

    /// 409: the transaction's blockhash is no longer valid.
    #[error("blockhash not found: {0}")]
    BlockhashExpired(String),

    /// 502: the RPC node refused the transaction.
    #[error("RPC broadcast failed: {0}")]
    BroadcastRejected(String),

    /// 500 from the broadcast endpoint, with the underlying detail.
    #[error("broadcast failed: {0}")]
    BroadcastFailed(String),

    /// 500 with a fixed message and no detail.
    #[error("{0}")]
    Internal(&'static str),

    /// 500 carrying the upstream error object under `details`.
    #[error("{error}")]
    Upstream {
        error: &'static str,
        details: serde_json::Value,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::BlockhashExpired(_) => StatusCode::CONFLICT,
            ApiError::BroadcastRejected(_) => StatusCode::BAD_GATEWAY,
            ApiError::BroadcastFailed(_) | ApiError::Internal(_) | ApiError::Upstream { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => ErrorBody::new(*msg),
            ApiError::BlockhashExpired(detail) => ErrorBody::with_detail(BLOCKHASH_NOT_FOUND, detail.clone()),
            ApiError::BroadcastRejected(detail) => ErrorBody::with_detail("RPC broadcast failed", detail.clone()),
            ApiError::BroadcastFailed(detail) => ErrorBody::with_detail("Broadcast failed", detail.clone()),
            ApiError::Upstream { error, details } => ErrorBody {
                error: (*error).to_string(),
                detail: None,
                details: Some(details.clone()),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("store error: {0}")]
    Store(#[from] devflation_store::StoreError),

    #[error("chain client error: {0}")]
    Chain(#[from] devflation_chain::ChainError),

    #[error("oracle error: {0}")]
    Oracle(#[from] devflation_oracle::OracleError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_errors_map_to_documented_statuses() {
        assert_eq!(ApiError::BlockhashExpired("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::BroadcastRejected("x".into()).status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ApiError::BroadcastFailed("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn blockhash_body_uses_error_code() {
        let body = ApiError::BlockhashExpired("Blockhash not found".into()).body();
        assert_eq!(body.error, "blockhash_not_found");
        assert_eq!(body.detail.as_deref(), Some("Blockhash not found"));
    }
}
