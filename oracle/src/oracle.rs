//! Cached, fail-soft price and metadata lookups.

use devflation_chain::TokenAccount;
use devflation_types::TokenView;
use devflation_utils::TtlCache;
use futures_util::future::join_all;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::source::{JupiterPrice, MarketSource, TokenInfo, TokenListEntry};

/// Quote currency for a price lookup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Quote {
    Usd,
    #[default]
    Usdc,
}

impl Quote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quote::Usd => "USD",
            Quote::Usdc => "USDC",
        }
    }
}

impl FromStr for Quote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USD" => Ok(Quote::Usd),
            "USDC" => Ok(Quote::Usdc),
            other => Err(format!("unsupported quote: {other}")),
        }
    }
}

/// A parsed `/api/price` request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceQuery {
    pub mints: Vec<String>,
    pub symbol: Option<String>,
    pub quote: Quote,
}

impl PriceQuery {
    /// `None` when neither a mint nor a symbol was given.
    ///
    /// `mint` may be a comma-separated list. When only `symbol` is present it
    /// doubles as the lookup key. Unknown quotes fall back to USDC.
    pub fn parse(mint: Option<&str>, symbol: Option<&str>, quote: Option<&str>) -> Option<Self> {
        let symbol = symbol.filter(|s| !s.is_empty());
        let key = mint.filter(|m| !m.is_empty()).or(symbol)?;
        let mints: Vec<String> = key
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if mints.is_empty() {
            return None;
        }
        Some(Self {
            mints,
            symbol: symbol.map(str::to_string),
            quote: quote.and_then(|q| q.parse().ok()).unwrap_or_default(),
        })
    }
}

/// Response shapes of `/api/price`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceAnswer {
    Prices(BTreeMap<String, Option<f64>>),
    Token(TokenInfo),
    Price(Option<f64>),
}

#[derive(Clone)]
enum CachedPrice {
    Single(Option<f64>),
    Batch(BTreeMap<String, Option<f64>>),
}

#[derive(Default)]
struct TokenIndex {
    by_address: HashMap<String, TokenListEntry>,
    by_symbol: HashMap<String, TokenListEntry>,
}

impl TokenIndex {
    fn build(entries: Vec<TokenListEntry>) -> Self {
        let mut index = Self::default();
        for entry in entries {
            if let Some(sym) = &entry.symbol {
                index
                    .by_symbol
                    .entry(sym.to_lowercase())
                    .or_insert_with(|| entry.clone());
            }
            index.by_address.insert(entry.address.clone(), entry);
        }
        index
    }
}

pub struct PriceOracle {
    source: Arc<dyn MarketSource>,
    prices: TtlCache<String, CachedPrice>,
    token_list: TtlCache<(), Arc<TokenIndex>>,
}

impl PriceOracle {
    pub fn new(source: Arc<dyn MarketSource>, price_ttl: Duration) -> Self {
        Self {
            source,
            prices: TtlCache::new(price_ttl),
            token_list: TtlCache::new(Duration::from_secs(3600)),
        }
    }

    /// Answer a price request. Never fails; unknown prices are `None`.
    pub async fn quote(&self, query: &PriceQuery) -> PriceAnswer {
        if query.mints.len() > 1 {
            return PriceAnswer::Prices(self.batch(query).await);
        }

        let mint = &query.mints[0];
        let key = format!(
            "{mint}::{}::{}",
            query.symbol.as_deref().unwrap_or_default().to_uppercase(),
            query.quote.as_str()
        );
        if let Some(CachedPrice::Single(price)) = self.prices.get(&key) {
            return PriceAnswer::Price(price);
        }

        match self.source.jupiter_search(mint).await {
            Ok(Some(mut info)) => {
                info.id.get_or_insert_with(|| mint.clone());
                self.prices.insert(key, CachedPrice::Single(info.usd_price));
                return PriceAnswer::Token(info);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(%mint, error = %e, "token search failed"),
        }

        let price = self
            .price_from_sources(mint, query.symbol.as_deref(), query.quote)
            .await;
        self.prices.insert(key, CachedPrice::Single(price));
        PriceAnswer::Price(price)
    }

    async fn batch(&self, query: &PriceQuery) -> BTreeMap<String, Option<f64>> {
        let key = format!("batch::{}::{}", query.mints.join(","), query.quote.as_str());
        if let Some(CachedPrice::Batch(prices)) = self.prices.get(&key) {
            return prices;
        }

        let prices = match self.source.jupiter_prices(&query.mints).await {
            Ok(found) => query
                .mints
                .iter()
                .map(|m| (m.clone(), found.get(m).and_then(|p| p.usd_price)))
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "batch price lookup failed, pricing one by one");
                let mut out = BTreeMap::new();
                for m in &query.mints {
                    let price = self.price_from_sources(m, None, query.quote).await;
                    out.insert(m.clone(), price);
                }
                out
            }
        };
        self.prices.insert(key, CachedPrice::Batch(prices.clone()));
        prices
    }

    /// Price a mint (or `SOL`) from the first source that knows it.
    ///
    /// Order: CoinGecko for SOL, Jupiter by mint, CoinGecko by the token
    /// list's `coingeckoId`, CoinGecko symbol search.
    pub async fn price_from_sources(&self, mint_or_symbol: &str, symbol: Option<&str>, quote: Quote) -> Option<f64> {
        let label = symbol.unwrap_or(mint_or_symbol).to_uppercase();
        if label == "SOL" {
            let usd = self.source.coingecko_market_usd("solana").await.ok().flatten()?;
            return self.convert(usd, quote).await;
        }

        let jupiter = self
            .source
            .jupiter_prices(&[mint_or_symbol.to_string()])
            .await
            .ok()
            .and_then(|p| p.get(mint_or_symbol).and_then(|p| p.usd_price));
        if let Some(usd) = jupiter {
            return self.convert(usd, quote).await;
        }

        if let Some(index) = self.token_index().await {
            let entry = index.by_address.get(mint_or_symbol).or_else(|| {
                symbol.and_then(|s| index.by_symbol.get(&s.to_lowercase()))
            });
            if let Some(id) = entry.and_then(|e| e.coingecko_id.as_deref()) {
                if let Some(p) = self.source.coingecko_simple_usd(id).await.ok().flatten().filter(|p| *p != 0.0) {
                    return Some(p);
                }
            }
        }

        let symbol = symbol?;
        let id = self.source.coingecko_search(symbol).await.ok().flatten()?;
        self.source
            .coingecko_simple_usd(&id)
            .await
            .ok()
            .flatten()
            .filter(|p| *p != 0.0)
    }

    async fn convert(&self, usd: f64, quote: Quote) -> Option<f64> {
        match quote {
            Quote::Usd => Some(usd),
            Quote::Usdc => {
                let usdc = self
                    .source
                    .coingecko_market_usd("usd-coin")
                    .await
                    .ok()
                    .flatten()
                    .filter(|p| *p != 0.0)?;
                Some(usd / usdc)
            }
        }
    }

    async fn token_index(&self) -> Option<Arc<TokenIndex>> {
        if let Some(index) = self.token_list.get(&()) {
            return Some(index);
        }
        match self.source.token_list().await {
            Ok(entries) => {
                let index = Arc::new(TokenIndex::build(entries));
                self.token_list.insert((), index.clone());
                Some(index)
            }
            Err(e) => {
                tracing::debug!(error = %e, "token list unavailable");
                None
            }
        }
    }

    /// Turn a wallet's token accounts into display rows.
    ///
    /// Metadata comes from the token list, then the Jupiter search for mints
    /// the list lacks. Decimals-0 tokens without a symbol are shown as `NFT`
    /// and a missing name falls back to the mint.
    pub async fn token_views(&self, accounts: Vec<TokenAccount>) -> Vec<TokenView> {
        let index = self.token_index().await.unwrap_or_default();
        let mints: Vec<String> = accounts.iter().map(|a| a.mint.clone()).collect();
        let prices = match self.source.jupiter_prices(&mints).await {
            Ok(prices) => prices,
            Err(e) => {
                tracing::debug!(error = %e, "token prices unavailable");
                HashMap::new()
            }
        };

        let rows = accounts.into_iter().map(|account| {
            let listed = index.by_address.get(&account.mint).cloned();
            let price = prices.get(&account.mint).copied().unwrap_or_default();
            async move { self.token_view(account, listed, price).await }
        });
        join_all(rows).await
    }

    async fn token_view(&self, account: TokenAccount, listed: Option<TokenListEntry>, price: JupiterPrice) -> TokenView {
        let mut symbol = listed.as_ref().and_then(|e| e.symbol.clone());
        let mut name = listed.as_ref().and_then(|e| e.name.clone());
        let mut logo = listed.as_ref().and_then(|e| e.logo_uri.clone());

        if symbol.is_none() && logo.is_none() {
            if let Ok(Some(found)) = self.source.jupiter_search(&account.mint).await {
                symbol = symbol.or(found.symbol);
                name = name.or(found.name);
                logo = logo.or(found.logo_uri);
            }
        }
        if symbol.is_none() && account.decimals == 0 {
            symbol = Some("NFT".to_string());
        }

        TokenView {
            name: Some(name.unwrap_or_else(|| account.mint.clone())),
            mint: account.mint,
            symbol,
            balance: account.ui_amount,
            decimals: account.decimals,
            logo_uri: logo.unwrap_or_default(),
            usd_price: price.usd_price,
            price_change_24h: price.price_change_24h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OracleError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct FakeSource {
        jupiter: HashMap<String, JupiterPrice>,
        jupiter_down: bool,
        search: HashMap<String, TokenInfo>,
        list: Vec<TokenListEntry>,
        gecko: HashMap<String, f64>,
        jupiter_calls: AtomicU32,
    }

    #[async_trait]
    impl MarketSource for FakeSource {
        async fn jupiter_prices(&self, mints: &[String]) -> Result<HashMap<String, JupiterPrice>, OracleError> {
            self.jupiter_calls.fetch_add(1, Ordering::SeqCst);
            if self.jupiter_down {
                return Err(OracleError::Http(503));
            }
            Ok(mints
                .iter()
                .filter_map(|m| self.jupiter.get(m).map(|p| (m.clone(), *p)))
                .collect())
        }
        async fn jupiter_search(&self, query: &str) -> Result<Option<TokenInfo>, OracleError> {
            Ok(self.search.get(query).cloned())
        }
        async fn token_list(&self) -> Result<Vec<TokenListEntry>, OracleError> {
            Ok(self.list.clone())
        }
        async fn coingecko_market_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError> {
            Ok(self.gecko.get(coin_id).copied())
        }
        async fn coingecko_simple_usd(&self, coin_id: &str) -> Result<Option<f64>, OracleError> {
            Ok(self.gecko.get(coin_id).copied())
        }
        async fn coingecko_search(&self, _symbol: &str) -> Result<Option<String>, OracleError> {
            Ok(None)
        }
    }

    fn price(usd: f64) -> JupiterPrice {
        JupiterPrice { usd_price: Some(usd), price_change_24h: Some(1.0) }
    }

    fn oracle(source: FakeSource) -> (PriceOracle, Arc<FakeSource>) {
        let source = Arc::new(source);
        (PriceOracle::new(source.clone(), Duration::from_secs(15)), source)
    }

    #[test]
    fn query_parsing() {
        assert!(PriceQuery::parse(None, None, None).is_none());
        let q = PriceQuery::parse(Some("A, B,"), None, None).unwrap();
        assert_eq!(q.mints, vec!["A", "B"]);
        assert_eq!(q.quote, Quote::Usdc);
        let q = PriceQuery::parse(None, Some("sol"), Some("usd")).unwrap();
        assert_eq!(q.mints, vec!["sol"]);
        assert_eq!(q.quote, Quote::Usd);
    }

    #[tokio::test]
    async fn batch_is_cached() {
        let mut source = FakeSource::default();
        source.jupiter.insert("A".into(), price(2.0));
        let (oracle, source) = oracle(source);
        let q = PriceQuery::parse(Some("A,B"), None, None).unwrap();

        let first = oracle.quote(&q).await;
        let second = oracle.quote(&q).await;
        let expected = PriceAnswer::Prices(BTreeMap::from([("A".to_string(), Some(2.0)), ("B".to_string(), None)]));
        assert_eq!(first, expected);
        assert_eq!(second, expected);
        assert_eq!(source.jupiter_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_mint_prefers_token_search() {
        let mut source = FakeSource::default();
        source.search.insert(
            "A".into(),
            TokenInfo { name: Some("Token A".into()), usd_price: Some(3.0), ..Default::default() },
        );
        let (oracle, _) = oracle(source);
        let q = PriceQuery::parse(Some("A"), None, Some("USD")).unwrap();
        match oracle.quote(&q).await {
            PriceAnswer::Token(info) => {
                assert_eq!(info.id.as_deref(), Some("A"));
                assert_eq!(info.usd_price, Some(3.0));
            }
            other => panic!("unexpected answer: {other:?}"),
        }
        assert_eq!(oracle.quote(&q).await, PriceAnswer::Price(Some(3.0)));
    }

    #[tokio::test]
    async fn sol_converts_to_usdc() {
        let mut source = FakeSource::default();
        source.gecko.insert("solana".into(), 150.0);
        source.gecko.insert("usd-coin".into(), 0.5);
        let (oracle, _) = oracle(source);
        assert_eq!(oracle.price_from_sources("SOL", None, Quote::Usdc).await, Some(300.0));
        assert_eq!(oracle.price_from_sources("SOL", None, Quote::Usd).await, Some(150.0));
    }

    #[tokio::test]
    async fn unknown_price_fails_soft() {
        let source = FakeSource { jupiter_down: true, ..Default::default() };
        let (oracle, _) = oracle(source);
        let q = PriceQuery::parse(Some("Nope"), None, None).unwrap();
        assert_eq!(oracle.quote(&q).await, PriceAnswer::Price(None));
    }

    #[tokio::test]
    async fn token_list_coingecko_fallback() {
        let mut source = FakeSource::default();
        source.list.push(TokenListEntry {
            address: "A".into(),
            coingecko_id: Some("token-a".into()),
            ..Default::default()
        });
        source.gecko.insert("token-a".into(), 0.25);
        let (oracle, _) = oracle(source);
        assert_eq!(oracle.price_from_sources("A", None, Quote::Usd).await, Some(0.25));
    }

    #[tokio::test]
    async fn token_views_enrich_and_label_nfts() {
        let mut source = FakeSource::default();
        source.list.push(TokenListEntry {
            address: "Listed".into(),
            symbol: Some("LST".into()),
            name: Some("Listed Token".into()),
            logo_uri: Some("logo".into()),
            ..Default::default()
        });
        source.jupiter.insert("Listed".into(), price(1.5));
        let (oracle, _) = oracle(source);

        let accounts = vec![
            TokenAccount { address: "a1".into(), mint: "Listed".into(), amount: "150".into(), decimals: 2, ui_amount: 1.5 },
            TokenAccount { address: "a2".into(), mint: "Art".into(), amount: "1".into(), decimals: 0, ui_amount: 1.0 },
        ];
        let views = oracle.token_views(accounts).await;
        assert_eq!(views[0].symbol.as_deref(), Some("LST"));
        assert_eq!(views[0].usd_price, Some(1.5));
        assert_eq!(views[1].symbol.as_deref(), Some("NFT"));
        assert_eq!(views[1].name.as_deref(), Some("Art"));
        assert_eq!(views[1].logo_uri, "");
        assert_eq!(views[1].usd_price, None);
    }
}
