//! Nullable history store: thread-safe in-memory storage for testing.

use async_trait::async_trait;
use devflation_store::{apply_status, pending_in, upsert_into, HistoryStore, PendingEntry, StoreError};
use devflation_types::{BurnHistoryRecord, BurnStatus, Timestamp};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

/// Per-wallet collections kept in a map, with the same upsert rules as the
/// file store.
pub struct NullHistoryStore {
    wallets: Mutex<HashMap<String, Vec<BurnHistoryRecord>>>,
    fail_writes: AtomicBool,
    writes: AtomicU32,
}

impl NullHistoryStore {
    pub fn new() -> Self {
        Self {
            wallets: Mutex::new(HashMap::new()),
            fail_writes: AtomicBool::new(false),
            writes: AtomicU32::new(0),
        }
    }

    /// Make every subsequent write fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Successful writes so far (upserts and status changes).
    pub fn writes(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current record for `(pubkey, mint)`.
    pub fn record(&self, pubkey: &str, mint: &str) -> Option<BurnHistoryRecord> {
        self.wallets
            .lock()
            .unwrap()
            .get(pubkey)?
            .iter()
            .find(|r| r.mint == mint)
            .cloned()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io(std::io::Error::other("writes disabled")));
        }
        Ok(())
    }
}

impl Default for NullHistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HistoryStore for NullHistoryStore {
    async fn upsert(&self, record: BurnHistoryRecord) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut wallets = self.wallets.lock().unwrap();
        upsert_into(wallets.entry(record.pubkey.clone()).or_default(), record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn update_status(
        &self,
        pubkey: &str,
        mint: &str,
        txid: &str,
        status: BurnStatus,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut wallets = self.wallets.lock().unwrap();
        let updated = wallets
            .get_mut(pubkey)
            .is_some_and(|records| apply_status(records, mint, txid, status, at));
        if updated {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(updated)
    }

    async fn read_all(&self, pubkey: &str) -> Result<Vec<BurnHistoryRecord>, StoreError> {
        Ok(self
            .wallets
            .lock()
            .unwrap()
            .get(pubkey)
            .cloned()
            .unwrap_or_default())
    }

    async fn pending(&self) -> Result<Vec<PendingEntry>, StoreError> {
        let wallets = self.wallets.lock().unwrap();
        Ok(wallets.values().flat_map(|records| pending_in(records)).collect())
    }
}
