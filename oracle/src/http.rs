//! [`MarketSource`] over HTTP: Jupiter lite API, CoinGecko and the Solana
//! token list.

use async_trait::async_trait;
use devflation_utils::{retry_async, RetryPolicy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

use crate::source::{JupiterPrice, MarketSource, TokenInfo, TokenListEntry};
use crate::OracleError;

/// Upstream base URLs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OracleEndpoints {
    #[serde(default = "default_jupiter_price_url")]
    pub jupiter_price_url: String,
    #[serde(default = "default_jupiter_search_url")]
    pub jupiter_search_url: String,
    #[serde(default = "default_coingecko_url")]
    pub coingecko_url: String,
    #[serde(default = "default_token_list_url")]
    pub token_list_url: String,
}

fn default_jupiter_price_url() -> String {
    "https://lite-api.jup.ag/price/v3".to_string()
}

fn default_jupiter_search_url() -> String {
    "https://lite-api.jup.ag/tokens/v2/search".to_string()
}

fn default_coingecko_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_token_list_url() -> String {
    "https://raw.githubusercontent.com/solana-labs/token-list/main/src/tokens/solana.tokenlist.json"
        .to_string()
}

impl Default for OracleEndpoints {
    fn default() -> Self {
        Self {
            jupiter_price_url: default_jupiter_price_url(),
            jupiter_search_url: default_jupiter_search_url(),
            coingecko_url: default_coingecko_url(),
            token_list_url: default_token_list_url(),
        }
    }
}

const MARKET_DATA_QUERY: [(&str, &str); 6] = [
    ("localization", "false"),
    ("tickers", "false"),
    ("market_data", "true"),
    ("community_data", "false"),
    ("developer_data", "false"),
    ("sparkline", "false"),
];

pub struct HttpMarketSource {
    http: reqwest::Client,
    endpoints: OracleEndpoints,
    retry: RetryPolicy,
}

impl HttpMarketSource {
    pub fn new(endpoints: OracleEndpoints) -> Result<Self, OracleError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| OracleError::Transport(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            endpoints,
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, OracleError> {
        retry_async(self.retry, || async {
            let response = self
                .http
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|e| OracleError::Transport(e.to_string()))?;
            if !response.status().is_success() {
                return Err(OracleError::Http(response.status().as_u16()));
            }
            response
                .json::<Value>()
                .await
                .map_err(|e| OracleError::InvalidResponse(e.to_string()))
        })
        .await
    }
}

#[async_trait]
impl MarketSource for HttpMarketSource {
    async fn jupiter_prices(&self, mints: &[String]) -> Result<HashMap<String, JupiterPrice>, OracleError> {
        if mints.is_empty() {
            return Ok(HashMap::new());
        }
        let ids = mints.join(",");
        let json = self
            .get_json(&self.endpoints.jupiter_price_url, &[("ids", ids.as_str())])
            .await?;
        Ok(parse_jupiter_prices(&json))
    }

    async fn jupiter_search(&self, query: &str) -> Result<Option<TokenInfo>, OracleError> {
        let json = self
            .get_json(&self.endpoints.jupiter_search_url, &[("query", query)])
            .await?;
        Ok(parse_search(&json, query))
    }

    async fn token_list(&self) -> Result<Vec<TokenListEntry>, OracleError> {
        let json = self.get_json(&self.endpoints.token_list_url, &[]).await?;
        Ok(parse_token_list(&json))
    }

    async fn coingecko_market_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError> {
        let url = format!("{}/coins/{coin_id}", self.endpoints.coingecko_url);
        let json = self.get_json(&url, &MARKET_DATA_QUERY).await?;
        Ok(json.pointer("/market_data/current_price/usd").and_then(Value::as_f64))
    }

    async fn coingecko_simple_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError> {
        let url = format!("{}/simple/price", self.endpoints.coingecko_url);
        let json = self
            .get_json(&url, &[("ids", coin_id), ("vs_currencies", "usd")])
            .await?;
        Ok(json.get(coin_id).and_then(|c| c.get("usd")).and_then(Value::as_f64))
    }

    async fn coingecko_search(&self, symbol: &str) -> Result<Option<String>, OracleError> {
        let url = format!("{}/search", self.endpoints.coingecko_url);
        let json = self.get_json(&url, &[("query", symbol)]).await?;
        let wanted = symbol.to_lowercase();
        Ok(json
            .get("coins")
            .and_then(Value::as_array)
            .and_then(|coins| {
                coins.iter().find(|c| {
                    c.get("symbol")
                        .and_then(Value::as_str)
                        .is_some_and(|s| s.to_lowercase() == wanted)
                })
            })
            .and_then(|c| c.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

// ── Response parsing ────────────────────────────────────────────────────

fn first_str(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| v.get(*k).and_then(Value::as_str).filter(|s| !s.is_empty()))
        .map(str::to_string)
}

fn first_f64(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| v.get(*k).and_then(Value::as_f64))
}

fn first_u8(v: &Value, keys: &[&str]) -> Option<u8> {
    keys.iter()
        .find_map(|k| v.get(*k).and_then(Value::as_u64))
        .and_then(|d| u8::try_from(d).ok())
}

pub(crate) fn parse_jupiter_prices(json: &Value) -> HashMap<String, JupiterPrice> {
    let Some(map) = json.as_object() else {
        return HashMap::new();
    };
    map.iter()
        .filter(|(_, v)| v.is_object())
        .map(|(mint, v)| {
            let price = JupiterPrice {
                usd_price: first_f64(v, &["usdPrice", "price"]),
                price_change_24h: first_f64(
                    v,
                    &[
                        "priceChange24h",
                        "priceChangePercent24h",
                        "price_change_24h",
                        "percent_change_24h",
                        "change24h",
                        "priceChange",
                    ],
                ),
            };
            (mint.clone(), price)
        })
        .collect()
}

fn token_info(v: &Value, fallback_id: Option<&str>) -> TokenInfo {
    TokenInfo {
        id: first_str(v, &["address", "mint", "id", "tokenAddress"]).or_else(|| fallback_id.map(str::to_string)),
        name: first_str(v, &["name", "title", "tokenName"]),
        symbol: first_str(v, &["symbol", "ticker"]),
        logo_uri: first_str(
            v,
            &["logo", "logoURI", "icon", "image", "logoUrl", "logo_url", "image_url"],
        ),
        usd_price: first_f64(v, &["usdPrice", "price", "priceUsd", "price_usd"]),
        decimals: first_u8(v, &["decimals", "dec"]),
    }
}

/// The search API has returned several shapes over time: a bare array, an
/// array under `data`/`tokens`/`results`/`items`, or an object keyed by mint.
pub(crate) fn parse_search(json: &Value, query: &str) -> Option<TokenInfo> {
    let candidates = json.as_array().or_else(|| {
        ["data", "tokens", "results", "items"]
            .iter()
            .find_map(|k| json.get(*k).and_then(Value::as_array))
    });
    let wanted = query.to_lowercase();

    match candidates {
        Some(list) if !list.is_empty() => {
            let found = list
                .iter()
                .find(|c| {
                    let addr = first_str(c, &["address", "mint", "id", "tokenAddress"]).unwrap_or_default();
                    let sym = first_str(c, &["symbol", "ticker"]).unwrap_or_default();
                    addr.to_lowercase() == wanted || sym.to_lowercase() == wanted
                })
                .unwrap_or(&list[0]);
            Some(token_info(found, None))
        }
        Some(_) => None,
        None => {
            let map = json.as_object()?;
            let (key, token) = map.iter().find(|(k, _)| k.to_lowercase() == wanted)?;
            Some(token_info(token, Some(key)))
        }
    }
}

pub(crate) fn parse_token_list(json: &Value) -> Vec<TokenListEntry> {
    json.get("tokens")
        .and_then(Value::as_array)
        .map(|tokens| {
            tokens
                .iter()
                .filter_map(|t| {
                    Some(TokenListEntry {
                        address: first_str(t, &["address"])?,
                        symbol: first_str(t, &["symbol"]),
                        name: first_str(t, &["name"]),
                        logo_uri: first_str(t, &["logoURI"]),
                        decimals: first_u8(t, &["decimals"]),
                        coingecko_id: t
                            .pointer("/extensions/coingeckoId")
                            .and_then(Value::as_str)
                            .map(str::to_string),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn jupiter_prices_accept_alternate_change_keys() {
        let json = json!({
            "MintA": {"usdPrice": 1.25, "priceChange24h": -3.5},
            "MintB": {"price": 0.5, "change24h": 2.0},
            "MintC": null
        });
        let prices = parse_jupiter_prices(&json);
        assert_eq!(prices.len(), 2);
        assert_eq!(prices["MintA"].usd_price, Some(1.25));
        assert_eq!(prices["MintA"].price_change_24h, Some(-3.5));
        assert_eq!(prices["MintB"].usd_price, Some(0.5));
        assert_eq!(prices["MintB"].price_change_24h, Some(2.0));
    }

    #[test]
    fn search_prefers_exact_match() {
        let json = json!([
            {"id": "Other", "symbol": "OTH", "name": "Other"},
            {"id": "MintA", "symbol": "AAA", "name": "Token A", "icon": "https://a/icon.png", "usdPrice": 2.0, "decimals": 6}
        ]);
        let info = parse_search(&json, "minta").unwrap();
        assert_eq!(info.id.as_deref(), Some("MintA"));
        assert_eq!(info.logo_uri.as_deref(), Some("https://a/icon.png"));
        assert_eq!(info.decimals, Some(6));
    }

    #[test]
    fn search_falls_back_to_first_candidate() {
        let json = json!({"data": [{"mint": "X", "ticker": "XX"}]});
        let info = parse_search(&json, "unknown").unwrap();
        assert_eq!(info.id.as_deref(), Some("X"));
        assert_eq!(info.symbol.as_deref(), Some("XX"));
    }

    #[test]
    fn search_reads_mint_keyed_object() {
        let json = json!({"MintA": {"name": "Token A", "logoURI": "l"}});
        let info = parse_search(&json, "MintA").unwrap();
        assert_eq!(info.id.as_deref(), Some("MintA"));
        assert_eq!(info.name.as_deref(), Some("Token A"));
        assert!(parse_search(&json!([]), "MintA").is_none());
    }

    #[test]
    fn token_list_reads_coingecko_extension() {
        let json = json!({"tokens": [
            {"address": "EPjF", "symbol": "USDC", "name": "USD Coin", "decimals": 6,
             "logoURI": "u", "extensions": {"coingeckoId": "usd-coin"}},
            {"symbol": "NOADDR"}
        ]});
        let list = parse_token_list(&json);
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].coingecko_id.as_deref(), Some("usd-coin"));
    }
}
