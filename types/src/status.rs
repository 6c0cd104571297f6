//! Client-side transaction status shown to the user after a broadcast.

use serde::{Deserialize, Serialize};

use crate::burn::{BurnMethod, BurnStatus};

/// Transient status of the latest burn, driven by the confirmation poller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxStatus {
    pub txid: String,
    pub status: BurnStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub method: BurnMethod,
}

impl TxStatus {
    pub fn pending(txid: impl Into<String>, method: BurnMethod) -> Self {
        Self {
            txid: txid.into(),
            status: BurnStatus::Pending,
            message: None,
            method,
        }
    }

    pub fn confirmed(txid: impl Into<String>, method: BurnMethod) -> Self {
        Self {
            txid: txid.into(),
            status: BurnStatus::Confirmed,
            message: None,
            method,
        }
    }

    pub fn failed(txid: impl Into<String>, method: BurnMethod, message: impl Into<String>) -> Self {
        Self {
            txid: txid.into(),
            status: BurnStatus::Failed,
            message: Some(message.into()),
            method,
        }
    }
}
