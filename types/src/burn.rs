//! Burn methods, burn statuses and the persisted history record.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;
use crate::time::Timestamp;

/// Placeholder stored when a broadcast arrives without an owner or mint.
pub const UNKNOWN: &str = "unknown";

/// Opaque display metadata (symbol, name, logo) passed through from the client.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// How the tokens are disposed of.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BurnMethod {
    /// SPL `Burn`: destroys the tokens and reduces supply.
    Burn,
    /// Transfer to the incinerator's associated token account.
    SendToIncinerator,
}

impl BurnMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            BurnMethod::Burn => "burn",
            BurnMethod::SendToIncinerator => "send_to_incinerator",
        }
    }
}

impl fmt::Display for BurnMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BurnMethod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "burn" => Ok(BurnMethod::Burn),
            "send_to_incinerator" | "incinerator" | "incinerate" => {
                Ok(BurnMethod::SendToIncinerator)
            }
            other => Err(ParseError::BurnMethod(other.to_string())),
        }
    }
}

/// Lifecycle of a broadcast burn transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BurnStatus {
    Pending,
    Confirmed,
    Failed,
}

impl BurnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BurnStatus::Pending => "pending",
            BurnStatus::Confirmed => "confirmed",
            BurnStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, BurnStatus::Pending)
    }
}

impl fmt::Display for BurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BurnStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BurnStatus::Pending),
            "confirmed" => Ok(BurnStatus::Confirmed),
            "failed" => Ok(BurnStatus::Failed),
            other => Err(ParseError::BurnStatus(other.to_string())),
        }
    }
}

/// The most recent burn attempt of one mint by one wallet.
///
/// `(pubkey, mint)` is the natural key: the store keeps a single record per
/// key and a later attempt replaces the earlier one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnHistoryRecord {
    pub pubkey: String,
    pub mint: String,
    #[serde(default)]
    pub txid: Option<String>,
    pub status: BurnStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inserted_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BurnHistoryRecord {
    /// Record written right after the chain accepted the transaction.
    pub fn pending(
        pubkey: impl Into<String>,
        mint: impl Into<String>,
        txid: impl Into<String>,
        metadata: Metadata,
        at: Timestamp,
    ) -> Self {
        Self {
            pubkey: pubkey.into(),
            mint: mint.into(),
            txid: Some(txid.into()),
            status: BurnStatus::Pending,
            inserted_at: Some(at),
            updated_at: None,
            metadata,
            error: None,
        }
    }

    /// Record written when the chain refused the transaction.
    pub fn failed(
        pubkey: impl Into<String>,
        mint: impl Into<String>,
        detail: impl Into<String>,
        metadata: Metadata,
        at: Timestamp,
    ) -> Self {
        Self {
            pubkey: pubkey.into(),
            mint: mint.into(),
            txid: None,
            status: BurnStatus::Failed,
            inserted_at: Some(at),
            updated_at: None,
            metadata,
            error: Some(detail.into()),
        }
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.pubkey, &self.mint)
    }

    /// Move the record to a new status, stamping `updatedAt`.
    pub fn set_status(&mut self, status: BurnStatus, at: Timestamp) {
        self.status = status;
        self.updated_at = Some(at);
    }
}
