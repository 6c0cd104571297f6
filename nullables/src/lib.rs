//! Nullable infrastructure for deterministic testing.
//!
//! Every outside dependency of the burn pipeline (the Solana node, the
//! wallet, the burn API, the history store, the market data sources) sits
//! behind a trait. This crate provides implementations that:
//! - Return scripted values
//! - Record what they were asked to do
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod api;
pub mod chain;
pub mod market;
pub mod store;
pub mod wallet;

pub use api::NullTxApi;
pub use chain::{failed_status, status, NullChain, StatusStep};
pub use market::NullMarketData;
pub use store::NullHistoryStore;
pub use wallet::NullWallet;
