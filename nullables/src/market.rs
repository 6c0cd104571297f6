//! Nullable market data: fixed prices and metadata, optional outage.

use async_trait::async_trait;
use devflation_oracle::{JupiterPrice, MarketSource, OracleError, TokenInfo, TokenListEntry};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

pub struct NullMarketData {
    prices: Mutex<HashMap<String, JupiterPrice>>,
    search: Mutex<HashMap<String, TokenInfo>>,
    list: Mutex<Vec<TokenListEntry>>,
    coingecko: Mutex<HashMap<String, f64>>,
    offline: AtomicBool,
    calls: AtomicU32,
}

impl NullMarketData {
    pub fn new() -> Self {
        Self {
            prices: Mutex::new(HashMap::new()),
            search: Mutex::new(HashMap::new()),
            list: Mutex::new(Vec::new()),
            coingecko: Mutex::new(HashMap::new()),
            offline: AtomicBool::new(false),
            calls: AtomicU32::new(0),
        }
    }

    pub fn set_price(&self, mint: &str, usd: f64) {
        self.prices.lock().unwrap().insert(
            mint.to_string(),
            JupiterPrice {
                usd_price: Some(usd),
                price_change_24h: None,
            },
        );
    }

    pub fn set_search_result(&self, query: &str, info: TokenInfo) {
        self.search.lock().unwrap().insert(query.to_string(), info);
    }

    pub fn add_list_entry(&self, entry: TokenListEntry) {
        self.list.lock().unwrap().push(entry);
    }

    pub fn set_coingecko_price(&self, coin_id: &str, usd: f64) {
        self.coingecko.lock().unwrap().insert(coin_id.to_string(), usd);
    }

    /// Every source answers with HTTP 503 while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Upstream calls made so far, across all sources.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) -> Result<(), OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(OracleError::Http(503));
        }
        Ok(())
    }
}

impl Default for NullMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketSource for NullMarketData {
    async fn jupiter_prices(&self, mints: &[String]) -> Result<HashMap<String, JupiterPrice>, OracleError> {
        self.hit()?;
        let prices = self.prices.lock().unwrap();
        Ok(mints
            .iter()
            .filter_map(|m| prices.get(m).map(|p| (m.clone(), *p)))
            .collect())
    }

    async fn jupiter_search(&self, query: &str) -> Result<Option<TokenInfo>, OracleError> {
        self.hit()?;
        Ok(self.search.lock().unwrap().get(query).cloned())
    }

    async fn token_list(&self) -> Result<Vec<TokenListEntry>, OracleError> {
        self.hit()?;
        Ok(self.list.lock().unwrap().clone())
    }

    async fn coingecko_market_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError> {
        self.hit()?;
        Ok(self.coingecko.lock().unwrap().get(coin_id).copied())
    }

    async fn coingecko_simple_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError> {
        self.hit()?;
        Ok(self.coingecko.lock().unwrap().get(coin_id).copied())
    }

    async fn coingecko_search(&self, symbol: &str) -> Result<Option<String>, OracleError> {
        self.hit()?;
        let coingecko = self.coingecko.lock().unwrap();
        Ok(coingecko
            .keys()
            .find(|id| id.eq_ignore_ascii_case(symbol))
            .cloned())
    }
}
