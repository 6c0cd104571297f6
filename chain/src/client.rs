//! The [`SolanaRpc`] trait and its JSON-RPC-over-HTTP implementation.

use async_trait::async_trait;
use base64::Engine;
use devflation_types::RecentBlockhash;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::error::ChainError;
use crate::types::{Commitment, SignatureStatus, TokenAccount, SPL_TOKEN_PROGRAM_ID};

/// Chain reads and writes used by the server and the client pipeline.
#[async_trait]
pub trait SolanaRpc: Send + Sync {
    async fn latest_blockhash(&self, commitment: Commitment) -> Result<RecentBlockhash, ChainError>;

    /// Submit a signed, serialized transaction. Returns its signature.
    async fn send_raw_transaction(&self, tx: &[u8]) -> Result<String, ChainError>;

    /// `None` while the cluster has not seen the signature.
    async fn signature_status(&self, txid: &str) -> Result<Option<SignatureStatus>, ChainError>;

    async fn account_exists(&self, address: &str) -> Result<bool, ChainError>;

    /// Native balance in lamports.
    async fn balance(&self, address: &str) -> Result<u64, ChainError>;

    async fn token_accounts_by_owner(&self, owner: &str) -> Result<Vec<TokenAccount>, ChainError>;

    /// Decimals of a mint, read from `getTokenSupply`.
    async fn token_decimals(&self, mint: &str) -> Result<u8, ChainError>;
}

// ── JsonRpcClient ───────────────────────────────────────────────────────

/// HTTP client for a Solana JSON-RPC endpoint.
#[derive(Debug)]
pub struct JsonRpcClient {
    http: reqwest::Client,
    url: String,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ChainError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: url.into(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one JSON-RPC request and return its `result`.
    async fn rpc_call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let response = self
            .http
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ChainError::Http(response.status().as_u16()));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))?;
        extract_result(method, json)
    }
}

#[async_trait]
impl SolanaRpc for JsonRpcClient {
    async fn latest_blockhash(&self, commitment: Commitment) -> Result<RecentBlockhash, ChainError> {
        let result = self
            .rpc_call("getLatestBlockhash", json!([{ "commitment": commitment.as_str() }]))
            .await?;
        parse_value(result.get("value"), "getLatestBlockhash")
    }

    async fn send_raw_transaction(&self, tx: &[u8]) -> Result<String, ChainError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(tx);
        let result = self
            .rpc_call(
                "sendTransaction",
                json!([encoded, {
                    "encoding": "base64",
                    "skipPreflight": false,
                    "preflightCommitment": Commitment::Finalized.as_str(),
                }]),
            )
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChainError::InvalidResponse("sendTransaction: signature is not a string".into()))
    }

    async fn signature_status(&self, txid: &str) -> Result<Option<SignatureStatus>, ChainError> {
        let result = self
            .rpc_call(
                "getSignatureStatuses",
                json!([[txid], { "searchTransactionHistory": true }]),
            )
            .await?;
        parse_signature_status(&result)
    }

    async fn account_exists(&self, address: &str) -> Result<bool, ChainError> {
        let result = self
            .rpc_call("getAccountInfo", json!([address, { "encoding": "base64" }]))
            .await?;
        Ok(!result.get("value").map_or(true, Value::is_null))
    }

    async fn balance(&self, address: &str) -> Result<u64, ChainError> {
        let result = self.rpc_call("getBalance", json!([address])).await?;
        parse_value(result.get("value"), "getBalance")
    }

    async fn token_accounts_by_owner(&self, owner: &str) -> Result<Vec<TokenAccount>, ChainError> {
        let result = self
            .rpc_call(
                "getTokenAccountsByOwner",
                json!([owner, { "programId": SPL_TOKEN_PROGRAM_ID }, { "encoding": "jsonParsed" }]),
            )
            .await?;
        parse_token_accounts(&result)
    }

    async fn token_decimals(&self, mint: &str) -> Result<u8, ChainError> {
        let result = self.rpc_call("getTokenSupply", json!([mint])).await?;
        result
            .pointer("/value/decimals")
            .and_then(Value::as_u64)
            .and_then(|d| u8::try_from(d).ok())
            .ok_or_else(|| ChainError::InvalidResponse("getTokenSupply: missing decimals".into()))
    }
}

// ── Response parsing ────────────────────────────────────────────────────

fn extract_result(method: &str, mut json: Value) -> Result<Value, ChainError> {
    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let code = err.get("code").and_then(Value::as_i64).unwrap_or_default();
        let message = err
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| err.to_string());
        return Err(ChainError::Rpc { code, message });
    }
    json.get_mut("result")
        .map(Value::take)
        .ok_or_else(|| ChainError::InvalidResponse(format!("{method}: missing result")))
}

fn parse_value<T: serde::de::DeserializeOwned>(value: Option<&Value>, method: &str) -> Result<T, ChainError> {
    let value = value.ok_or_else(|| ChainError::InvalidResponse(format!("{method}: missing value")))?;
    serde_json::from_value(value.clone()).map_err(|e| ChainError::InvalidResponse(format!("{method}: {e}")))
}

fn parse_signature_status(result: &Value) -> Result<Option<SignatureStatus>, ChainError> {
    let first = result
        .pointer("/value/0")
        .ok_or_else(|| ChainError::InvalidResponse("getSignatureStatuses: missing value".into()))?;
    if first.is_null() {
        return Ok(None);
    }
    parse_value(Some(first), "getSignatureStatuses").map(Some)
}

fn parse_token_accounts(result: &Value) -> Result<Vec<TokenAccount>, ChainError> {
    let entries = result
        .get("value")
        .and_then(Value::as_array)
        .ok_or_else(|| ChainError::InvalidResponse("getTokenAccountsByOwner: missing value".into()))?;

    let mut accounts = Vec::with_capacity(entries.len());
    for entry in entries {
        let Some(info) = entry.pointer("/account/data/parsed/info") else {
            continue;
        };
        let (Some(mint), Some(amount)) = (
            info.get("mint").and_then(Value::as_str),
            info.get("tokenAmount"),
        ) else {
            continue;
        };
        let decimals = amount
            .get("decimals")
            .and_then(Value::as_u64)
            .and_then(|d| u8::try_from(d).ok())
            .unwrap_or(0);
        let raw = amount
            .get("amount")
            .and_then(Value::as_str)
            .unwrap_or("0")
            .to_string();
        let ui_amount = amount
            .get("uiAmount")
            .and_then(Value::as_f64)
            .or_else(|| {
                amount
                    .get("uiAmountString")
                    .and_then(Value::as_str)
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or(0.0);
        accounts.push(TokenAccount {
            address: entry.get("pubkey").and_then(Value::as_str).unwrap_or_default().to_string(),
            mint: mint.to_string(),
            amount: raw,
            decimals,
            ui_amount,
        });
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};

    #[test]
    fn rpc_error_keeps_node_message() {
        let err = extract_result(
            "sendTransaction",
            json!({"jsonrpc":"2.0","id":1,"error":{"code":-32002,"message":"Transaction simulation failed: Blockhash not found"}}),
        )
        .unwrap_err();
        match err {
            ChainError::Rpc { code, message } => {
                assert_eq!(code, -32002);
                assert!(message.contains("Blockhash not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unseen_signature_is_none() {
        let result = json!({"context":{"slot":1},"value":[null]});
        assert_eq!(parse_signature_status(&result).unwrap(), None);
    }

    #[test]
    fn token_accounts_are_flattened() {
        let result = json!({"context":{"slot":1},"value":[{
            "pubkey": "Ata111",
            "account": {"data": {"parsed": {"info": {
                "mint": "Mint111",
                "tokenAmount": {"amount": "10050", "decimals": 2, "uiAmount": 100.5, "uiAmountString": "100.5"}
            }}}}
        }, {
            "pubkey": "Broken",
            "account": {"data": ["", "base64"]}
        }]});
        let accounts = parse_token_accounts(&result).unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].mint, "Mint111");
        assert_eq!(accounts[0].amount, "10050");
        assert_eq!(accounts[0].decimals, 2);
        assert_eq!(accounts[0].ui_amount, 100.5);
    }

    async fn spawn_node() -> String {
        async fn handle(Json(req): Json<Value>) -> Json<Value> {
            let id = req["id"].clone();
            let result = match req["method"].as_str().unwrap_or_default() {
                "getLatestBlockhash" => {
                    assert_eq!(req["params"][0]["commitment"], "finalized");
                    json!({"context":{"slot":5},"value":{"blockhash":"Hash111","lastValidBlockHeight":150}})
                }
                "getBalance" => json!({"context":{"slot":5},"value":2_500_000_000u64}),
                "getTokenSupply" => json!({"context":{"slot":5},"value":{"amount":"1","decimals":6,"uiAmount":0.000001}}),
                "getAccountInfo" => json!({"context":{"slot":5},"value":null}),
                _ => return Json(json!({"jsonrpc":"2.0","id":id,"error":{"code":-32601,"message":"Method not found"}})),
            };
            Json(json!({"jsonrpc":"2.0","id":id,"result":result}))
        }

        let app = Router::new().route("/", post(handle));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn client_reads_from_node() {
        let client = JsonRpcClient::new(spawn_node().await).unwrap();

        let hash = client.latest_blockhash(Commitment::Finalized).await.unwrap();
        assert_eq!(hash.blockhash, "Hash111");
        assert_eq!(hash.last_valid_block_height, 150);
        assert_eq!(client.balance("Owner").await.unwrap(), 2_500_000_000);
        assert_eq!(client.token_decimals("Mint").await.unwrap(), 6);
        assert!(!client.account_exists("Ata").await.unwrap());
    }

    #[tokio::test]
    async fn client_surfaces_rpc_errors() {
        let client = JsonRpcClient::new(spawn_node().await).unwrap();
        let err = client.send_raw_transaction(&[1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, ChainError::Rpc { code: -32601, .. }));
    }
}
