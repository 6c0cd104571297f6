//! File-per-wallet JSON backend.
//!
//! Layout: `<data_dir>/<pubkey>.burns.json`, each a JSON array of
//! [`BurnHistoryRecord`]. Every read-modify-write for a wallet holds that
//! wallet's async lock, and files are replaced by writing a sibling temp file
//! and renaming it over the original.

use async_trait::async_trait;
use devflation_types::{BurnHistoryRecord, BurnStatus, Timestamp};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::history::{apply_status, pending_in, upsert_into, HistoryStore, PendingEntry};
use crate::StoreError;

const FILE_SUFFIX: &str = ".burns.json";

pub struct FileHistoryStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl FileHistoryStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, pubkey: &str) -> Result<PathBuf, StoreError> {
        validate_key(pubkey)?;
        Ok(self.dir.join(format!("{pubkey}{FILE_SUFFIX}")))
    }

    fn locks(&self) -> MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Take the wallet's write lock, creating its entry on first use.
    async fn lock_wallet(&self, pubkey: &str) -> WalletGuard<'_> {
        let lock = self.locks().entry(pubkey.to_string()).or_default().clone();
        let guard = lock.clone().lock_owned().await;
        WalletGuard {
            store: self,
            pubkey: pubkey.to_string(),
            lock,
            guard: Some(guard),
        }
    }

    async fn load(path: &Path) -> Result<Vec<BurnHistoryRecord>, StoreError> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        serde_json::from_slice(&raw)
            .map_err(|e| StoreError::Corruption(format!("{}: {e}", path.display())))
    }

    async fn save(path: &Path, records: &[BurnHistoryRecord]) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }
}

/// A held wallet lock. On release the map entry is dropped if no other task
/// holds or waits on it, so the map only tracks wallets in use.
struct WalletGuard<'a> {
    store: &'a FileHistoryStore,
    pubkey: String,
    lock: Arc<AsyncMutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for WalletGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut locks = self.store.locks();
        // Only the map and `self.lock` are left.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.pubkey);
        }
    }
}

/// Wallet keys become file names, so only base58-style characters pass.
fn validate_key(pubkey: &str) -> Result<(), StoreError> {
    if pubkey.is_empty() || pubkey.len() > 64 || !pubkey.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(StoreError::InvalidKey(pubkey.to_string()));
    }
    Ok(())
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn upsert(&self, record: BurnHistoryRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.pubkey)?;
        let _guard = self.lock_wallet(&record.pubkey).await;

        let mut records = Self::load(&path).await?;
        upsert_into(&mut records, record);
        Self::save(&path, &records).await
    }

    async fn update_status(
        &self,
        pubkey: &str,
        mint: &str,
        txid: &str,
        status: BurnStatus,
        at: Timestamp,
    ) -> Result<bool, StoreError> {
        let path = self.path_for(pubkey)?;
        let _guard = self.lock_wallet(pubkey).await;

        let mut records = Self::load(&path).await?;
        if !apply_status(&mut records, mint, txid, status, at) {
            return Ok(false);
        }
        Self::save(&path, &records).await?;
        Ok(true)
    }

    async fn read_all(&self, pubkey: &str) -> Result<Vec<BurnHistoryRecord>, StoreError> {
        let path = self.path_for(pubkey)?;
        Self::load(&path).await
    }

    fn validate_key(&self, pubkey: &str) -> Result<(), StoreError> {
        validate_key(pubkey)
    }

    async fn pending(&self) -> Result<Vec<PendingEntry>, StoreError> {
        let mut found = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(FILE_SUFFIX) {
                continue;
            }
            match Self::load(&entry.path()).await {
                Ok(records) => found.extend(pending_in(&records)),
                Err(e) => tracing::warn!(file = %name, error = %e, "skipping unreadable history file"),
            }
        }
        Ok(found)
    }
}
