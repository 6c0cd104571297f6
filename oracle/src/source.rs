//! The upstream data seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::OracleError;

/// One Jupiter price entry.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct JupiterPrice {
    pub usd_price: Option<f64>,
    pub price_change_24h: Option<f64>,
}

/// Display metadata for a token as reported by a token search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenInfo {
    pub id: Option<String>,
    pub name: Option<String>,
    pub symbol: Option<String>,
    #[serde(rename = "logoURI")]
    pub logo_uri: Option<String>,
    pub usd_price: Option<f64>,
    pub decimals: Option<u8>,
}

/// One entry of the public Solana token list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TokenListEntry {
    pub address: String,
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub logo_uri: Option<String>,
    pub decimals: Option<u8>,
    pub coingecko_id: Option<String>,
}

#[async_trait]
pub trait MarketSource: Send + Sync {
    /// Jupiter prices for every mint it knows, keyed by mint.
    async fn jupiter_prices(&self, mints: &[String]) -> Result<HashMap<String, JupiterPrice>, OracleError>;

    /// Best match from the Jupiter token search for a mint or symbol.
    async fn jupiter_search(&self, query: &str) -> Result<Option<TokenInfo>, OracleError>;

    async fn token_list(&self) -> Result<Vec<TokenListEntry>, OracleError>;

    /// CoinGecko market-data USD price for a coin id (`solana`, `usd-coin`).
    async fn coingecko_market_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError>;

    /// CoinGecko simple-price USD quote for a coin id.
    async fn coingecko_simple_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError>;

    /// CoinGecko coin id whose symbol matches exactly (case-insensitive).
    async fn coingecko_search(&self, symbol: &str) -> Result<Option<String>, OracleError>;
}
