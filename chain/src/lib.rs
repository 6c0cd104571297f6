//! Solana JSON-RPC access.
//!
//! Only the handful of methods the burn pipeline needs are covered. Callers
//! depend on the [`SolanaRpc`] trait; [`JsonRpcClient`] is the HTTP
//! implementation and the nullables crate provides a scripted one.

pub mod client;
pub mod error;
pub mod types;

pub use client::{JsonRpcClient, SolanaRpc};
pub use error::ChainError;
pub use types::{Commitment, SignatureStatus, TokenAccount, SPL_TOKEN_PROGRAM_ID};
