//! History store trait and the collection helpers every backend shares.

use async_trait::async_trait;
use devflation_types::{BurnHistoryRecord, BurnStatus, Timestamp};

use crate::StoreError;

/// A `pending` record that still needs a chain confirmation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PendingEntry {
    pub pubkey: String,
    pub mint: String,
    pub txid: String,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Insert the record, or replace the existing one with the same mint.
    async fn upsert(&self, record: BurnHistoryRecord) -> Result<(), StoreError>;

    /// Move the record for `(pubkey, mint)` to `status`.
    ///
    /// Applies only while the stored record still carries `txid`, so an older
    /// attempt's confirmation cannot overwrite a newer burn of the same mint.
    /// Returns whether a record was updated.
    async fn update_status(
        &self,
        pubkey: &str,
        mint: &str,
        txid: &str,
        status: BurnStatus,
        at: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Every record for the wallet. An unknown wallet yields an empty list.
    async fn read_all(&self, pubkey: &str) -> Result<Vec<BurnHistoryRecord>, StoreError>;

    /// All records across wallets that are still `pending` and have a txid.
    async fn pending(&self) -> Result<Vec<PendingEntry>, StoreError>;

    /// Whether `pubkey` can key a collection in this backend. Callers check
    /// before doing anything that must be recorded.
    fn validate_key(&self, _pubkey: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Replace the record sharing `record.mint`, or append it.
pub fn upsert_into(records: &mut Vec<BurnHistoryRecord>, record: BurnHistoryRecord) {
    match records.iter_mut().find(|r| r.mint == record.mint) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Apply a confirmation result to the matching record. Returns `true` if a
/// record changed.
pub fn apply_status(
    records: &mut [BurnHistoryRecord],
    mint: &str,
    txid: &str,
    status: BurnStatus,
    at: Timestamp,
) -> bool {
    match records
        .iter_mut()
        .find(|r| r.mint == mint && r.txid.as_deref() == Some(txid))
    {
        Some(record) => {
            record.set_status(status, at);
            true
        }
        None => false,
    }
}

/// Collect the pending entries of one wallet's collection.
pub fn pending_in(records: &[BurnHistoryRecord]) -> impl Iterator<Item = PendingEntry> + '_ {
    records.iter().filter_map(|r| match (&r.status, &r.txid) {
        (BurnStatus::Pending, Some(txid)) => Some(PendingEntry {
            pubkey: r.pubkey.clone(),
            mint: r.mint.clone(),
            txid: txid.clone(),
        }),
        _ => None,
    })
}
