//! Fundamental types for the Devflation burn pipeline.
//!
//! This crate defines the types shared by the HTTP API, the history store and
//! the wallet-side pipeline: burn methods and statuses, the persisted history
//! record, the transient client status, amount conversion, and the JSON wire
//! types exchanged between client and server.

pub mod amount;
pub mod api;
pub mod burn;
pub mod error;
pub mod status;
pub mod time;

pub use amount::TokenAmount;
pub use api::{
    BalanceResponse, BroadcastErrorKind, BroadcastRequest, BroadcastResponse, ErrorBody,
    HistoryResponse, RecentBlockhash, TokenView, TokensResponse,
};
pub use burn::{BurnHistoryRecord, BurnMethod, BurnStatus, Metadata, UNKNOWN};
pub use error::{AmountError, ParseError};
pub use status::TxStatus;
pub use time::Timestamp;
