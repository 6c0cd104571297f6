//! Price and metadata oracle.
//!
//! Every lookup here is best-effort: upstream failures turn into `None`
//! values, never into errors surfaced to the burn flow. [`MarketSource`] is
//! the seam to the outside world (Jupiter, CoinGecko, the public token list);
//! [`PriceOracle`] layers caching and fallback order on top of it.

pub mod error;
pub mod http;
pub mod oracle;
pub mod source;

pub use error::OracleError;
pub use http::{HttpMarketSource, OracleEndpoints};
pub use oracle::{PriceAnswer, PriceOracle, PriceQuery, Quote};
pub use source::{JupiterPrice, MarketSource, TokenInfo, TokenListEntry};
