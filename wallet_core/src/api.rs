//! HTTP client for the burn API.

use async_trait::async_trait;
use devflation_types::{
    BalanceResponse, BroadcastErrorKind, BroadcastRequest, BroadcastResponse, BurnHistoryRecord,
    ErrorBody, HistoryResponse, RecentBlockhash, TokenView, TokensResponse,
};
use devflation_utils::TtlCache;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::error::WalletError;

/// How long per-wallet token and balance lookups are reused.
pub const WALLET_CACHE_TTL: Duration = Duration::from_secs(30);

/// A broadcast the API did not accept.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct BroadcastFailure {
    pub kind: BroadcastErrorKind,
    /// Raw reason, shown to the user verbatim.
    pub detail: String,
}

impl BroadcastFailure {
    pub fn new(kind: BroadcastErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// The transaction endpoints the burn pipeline depends on.
#[async_trait]
pub trait TxApi: Send + Sync {
    async fn recent_blockhash(&self) -> Result<RecentBlockhash, WalletError>;

    async fn broadcast(&self, req: &BroadcastRequest) -> Result<String, BroadcastFailure>;

    async fn history(&self, pubkey: &str) -> Result<Vec<BurnHistoryRecord>, WalletError>;
}

/// Per-wallet token list and SOL balance, cleared when the wallet changes.
pub struct WalletCache {
    tokens: TtlCache<String, Vec<TokenView>>,
    balances: TtlCache<String, f64>,
}

impl WalletCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: TtlCache::new(ttl),
            balances: TtlCache::new(ttl),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.balances.is_empty()
    }

    pub fn forget(&self, pubkey: &str) {
        let key = pubkey.to_string();
        self.tokens.remove(&key);
        self.balances.remove(&key);
    }

    pub fn clear(&self) {
        self.tokens.clear();
        self.balances.clear();
    }
}

impl Default for WalletCache {
    fn default() -> Self {
        Self::new(WALLET_CACHE_TTL)
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    cache: Arc<WalletCache>,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WalletError::Api(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cache: Arc::new(WalletCache::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn cache(&self) -> Arc<WalletCache> {
        Arc::clone(&self.cache)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WalletError> {
        let response = self
            .http
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .map_err(|e| WalletError::Api(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let reason = match response.json::<ErrorBody>().await {
                Ok(body) => body.detail.unwrap_or(body.error),
                Err(_) => format!("HTTP {}", status.as_u16()),
            };
            return Err(WalletError::Api(reason));
        }

        response
            .json()
            .await
            .map_err(|e| WalletError::Api(format!("invalid JSON response: {e}")))
    }

    /// SPL tokens held by `pubkey`, cached per wallet.
    pub async fn solana_tokens(&self, pubkey: &str) -> Result<Vec<TokenView>, WalletError> {
        let key = pubkey.to_string();
        if let Some(tokens) = self.cache.tokens.get(&key) {
            return Ok(tokens);
        }
        let resp: TokensResponse = self
            .get_json("/api/solana-tokens", &[("publicKey", pubkey)])
            .await?;
        self.cache.tokens.insert(key, resp.tokens.clone());
        Ok(resp.tokens)
    }

    /// SOL balance of `pubkey`, cached per wallet.
    pub async fn solana_balance(&self, pubkey: &str) -> Result<f64, WalletError> {
        let key = pubkey.to_string();
        if let Some(sol) = self.cache.balances.get(&key) {
            return Ok(sol);
        }
        let resp: BalanceResponse = self
            .get_json("/api/solana-balance", &[("publicKey", pubkey)])
            .await?;
        self.cache.balances.insert(key, resp.sol);
        Ok(resp.sol)
    }
}

#[async_trait]
impl TxApi for ApiClient {
    async fn recent_blockhash(&self) -> Result<RecentBlockhash, WalletError> {
        self.get_json("/api/tx/recent-blockhash", &[]).await
    }

    async fn broadcast(&self, req: &BroadcastRequest) -> Result<String, BroadcastFailure> {
        let response = self
            .http
            .post(self.url("/api/tx/broadcast"))
            .json(req)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "broadcast request did not reach the API");
                BroadcastFailure::new(BroadcastErrorKind::NetworkError, e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let body: BroadcastResponse = response.json().await.map_err(|e| {
                BroadcastFailure::new(BroadcastErrorKind::RpcError, format!("invalid broadcast response: {e}"))
            })?;
            debug!(txid = %body.txid, "broadcast accepted");
            return Ok(body.txid);
        }

        Err(match response.json::<ErrorBody>().await {
            Ok(body) => {
                let kind = if status == reqwest::StatusCode::CONFLICT {
                    BroadcastErrorKind::from_error_code(&body.error)
                } else {
                    BroadcastErrorKind::RpcError
                };
                BroadcastFailure::new(kind, body.detail.unwrap_or(body.error))
            }
            Err(_) => BroadcastFailure::new(
                BroadcastErrorKind::RpcError,
                format!("broadcast failed with HTTP {}", status.as_u16()),
            ),
        })
    }

    async fn history(&self, pubkey: &str) -> Result<Vec<BurnHistoryRecord>, WalletError> {
        let resp: HistoryResponse = self.get_json("/api/tx/history", &[("pubkey", pubkey)]).await?;
        Ok(resp.burns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_drops_trailing_slash() {
        let client = ApiClient::new("http://localhost:3000/").unwrap();
        assert_eq!(client.url("/api/tx/history"), "http://localhost:3000/api/tx/history");
    }

    #[test]
    fn cache_forgets_one_wallet() {
        let cache = WalletCache::default();
        cache.balances.insert("a".into(), 1.0);
        cache.balances.insert("b".into(), 2.0);
        cache.forget("a");
        assert_eq!(cache.balances.get(&"a".to_string()), None);
        assert_eq!(cache.balances.get(&"b".to_string()), Some(2.0));
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn unreachable_api_is_a_network_failure() {
        // Port 9 (discard) on localhost is not served in test environments.
        let client = ApiClient::new("http://127.0.0.1:9").unwrap();
        let err = client.broadcast(&BroadcastRequest::default()).await.unwrap_err();
        assert_eq!(err.kind, BroadcastErrorKind::NetworkError);
    }
}
