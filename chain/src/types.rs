//! Typed views of the RPC results the pipeline reads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// SPL Token program, used to filter token accounts.
pub const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    #[default]
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Commitment::Processed => "processed",
            Commitment::Confirmed => "confirmed",
            Commitment::Finalized => "finalized",
        }
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of a `getSignatureStatuses` result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatus {
    pub slot: u64,
    #[serde(default)]
    pub confirmations: Option<u64>,
    #[serde(default)]
    pub err: Option<serde_json::Value>,
    #[serde(default)]
    pub confirmation_status: Option<Commitment>,
}

impl SignatureStatus {
    /// True once the status has reached at least `level`.
    ///
    /// Nodes that omit `confirmationStatus` report `confirmations: null` for
    /// rooted transactions, which counts as finalized.
    pub fn reached(&self, level: Commitment) -> bool {
        match self.confirmation_status {
            Some(status) => status >= level,
            None => self.confirmations.is_none(),
        }
    }

    /// JSON rendering of the on-chain error, if the transaction failed.
    pub fn error_detail(&self) -> Option<String> {
        match &self.err {
            None | Some(serde_json::Value::Null) => None,
            Some(err) => Some(err.to_string()),
        }
    }
}

/// A token account owned by a wallet, as returned by the `jsonParsed` encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct TokenAccount {
    pub address: String,
    pub mint: String,
    pub amount: String,
    pub decimals: u8,
    pub ui_amount: f64,
}
