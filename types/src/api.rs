//! JSON wire types shared by the HTTP API and its clients.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use crate::burn::{BurnHistoryRecord, Metadata};

/// Error code returned with HTTP 409 when the transaction's blockhash expired.
pub const BLOCKHASH_NOT_FOUND: &str = "blockhash_not_found";

/// Classification of a failed broadcast.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BroadcastErrorKind {
    /// The blockhash is unknown to the cluster; re-sign with a fresh one.
    BlockhashNotFound,
    /// The RPC node refused the transaction for any other reason.
    RpcError,
    /// The broadcast endpoint could not be reached.
    NetworkError,
}

impl BroadcastErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BroadcastErrorKind::BlockhashNotFound => BLOCKHASH_NOT_FOUND,
            BroadcastErrorKind::RpcError => "rpc_error",
            BroadcastErrorKind::NetworkError => "network_error",
        }
    }

    /// Only an expired blockhash can be fixed by re-signing.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BroadcastErrorKind::BlockhashNotFound)
    }

    /// Map the `error` field of an API error body to a kind.
    pub fn from_error_code(code: &str) -> Self {
        if code == BLOCKHASH_NOT_FOUND {
            BroadcastErrorKind::BlockhashNotFound
        } else {
            BroadcastErrorKind::RpcError
        }
    }
}

impl fmt::Display for BroadcastErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Transaction endpoints ───────────────────────────────────────────────

/// `GET /api/tx/recent-blockhash` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// `POST /api/tx/broadcast` body.
///
/// Every field is optional on the wire so the handler can answer a missing
/// payload with its own 400 body instead of a generic rejection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastRequest {
    #[serde(default)]
    pub signed_tx_base64: Option<String>,
    #[serde(default)]
    pub pubkey: Option<String>,
    #[serde(default)]
    pub mint: Option<String>,
    #[serde(default, deserialize_with = "object_or_none")]
    pub metadata: Option<Metadata>,
}

/// Client metadata is informational; anything but an object is dropped.
fn object_or_none<'de, D: Deserializer<'de>>(de: D) -> Result<Option<Metadata>, D::Error> {
    Ok(match serde_json::Value::deserialize(de)? {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    })
}

/// `POST /api/tx/broadcast` success body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub txid: String,
}

/// `GET /api/tx/history` response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub burns: Vec<BurnHistoryRecord>,
}

/// Error body used by every endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            details: None,
        }
    }

    pub fn with_detail(error: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: Some(detail.into()),
            details: None,
        }
    }
}

// ── Wallet endpoints ────────────────────────────────────────────────────

/// One SPL token held by a wallet, enriched with display metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenView {
    pub mint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub balance: f64,
    pub decimals: u8,
    #[serde(rename = "logoURI", default)]
    pub logo_uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usd_price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_change_24h: Option<f64>,
}

/// `GET /api/solana-tokens` response.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct TokensResponse {
    pub tokens: Vec<TokenView>,
}

/// `GET /api/solana-balance` response.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub sol: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_blockhash_errors_retry() {
        assert!(BroadcastErrorKind::BlockhashNotFound.is_retryable());
        assert!(!BroadcastErrorKind::RpcError.is_retryable());
        assert!(!BroadcastErrorKind::NetworkError.is_retryable());
    }

    #[test]
    fn error_codes_map_to_kinds() {
        assert_eq!(
            BroadcastErrorKind::from_error_code("blockhash_not_found"),
            BroadcastErrorKind::BlockhashNotFound
        );
        assert_eq!(
            BroadcastErrorKind::from_error_code("RPC broadcast failed"),
            BroadcastErrorKind::RpcError
        );
    }

    #[test]
    fn broadcast_request_accepts_missing_fields() {
        let req: BroadcastRequest = serde_json::from_str(r#"{"pubkey":"abc"}"#).unwrap();
        assert!(req.signed_tx_base64.is_none());
        assert_eq!(req.pubkey.as_deref(), Some("abc"));
    }

    #[test]
    fn non_object_metadata_is_dropped() {
        let req: BroadcastRequest =
            serde_json::from_str(r#"{"signedTxBase64":"AQ==","metadata":"DEV"}"#).unwrap();
        assert_eq!(req.signed_tx_base64.as_deref(), Some("AQ=="));
        assert!(req.metadata.is_none());

        let req: BroadcastRequest =
            serde_json::from_str(r#"{"metadata":{"symbol":"DEV"}}"#).unwrap();
        assert_eq!(req.metadata.unwrap()["symbol"], "DEV");
    }

    #[test]
    fn token_view_uses_logo_uri_key() {
        let view = TokenView {
            mint: "M".into(),
            symbol: None,
            name: Some("M".into()),
            balance: 1.5,
            decimals: 6,
            logo_uri: String::new(),
            usd_price: None,
            price_change_24h: None,
        };
        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("logoURI").is_some());
        assert!(json.get("symbol").is_none());
    }
}
