//! Nullable burn API: scripted broadcast results, recorded requests.

use async_trait::async_trait;
use devflation_types::{BroadcastErrorKind, BroadcastRequest, BurnHistoryRecord, RecentBlockhash};
use devflation_wallet_core::{BroadcastFailure, TxApi, WalletError};
use solana_sdk::hash::Hash;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

pub struct NullTxApi {
    blockhash_fails: Mutex<bool>,
    blockhash_calls: AtomicU32,
    results: Mutex<VecDeque<Result<String, BroadcastFailure>>>,
    requests: Mutex<Vec<BroadcastRequest>>,
    history: Mutex<Vec<BurnHistoryRecord>>,
}

impl NullTxApi {
    pub fn new() -> Self {
        Self {
            blockhash_fails: Mutex::new(false),
            blockhash_calls: AtomicU32::new(0),
            results: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
        }
    }

    /// Queue the result of the next broadcast. With an empty queue every
    /// broadcast succeeds with `nulltx<n>`.
    pub fn push_broadcast_result(&self, result: Result<String, BroadcastFailure>) {
        self.results.lock().unwrap().push_back(result);
    }

    /// Answer the next `count` broadcasts with `blockhash_not_found`.
    pub fn expire_blockhash(&self, count: usize) {
        for _ in 0..count {
            self.push_broadcast_result(Err(BroadcastFailure::new(
                BroadcastErrorKind::BlockhashNotFound,
                "Blockhash not found",
            )));
        }
    }

    pub fn fail_blockhash(&self, fail: bool) {
        *self.blockhash_fails.lock().unwrap() = fail;
    }

    pub fn set_history(&self, records: Vec<BurnHistoryRecord>) {
        *self.history.lock().unwrap() = records;
    }

    pub fn broadcasts(&self) -> u32 {
        self.requests.lock().unwrap().len() as u32
    }

    pub fn requests(&self) -> Vec<BroadcastRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn blockhash_calls(&self) -> u32 {
        self.blockhash_calls.load(Ordering::SeqCst)
    }
}

impl Default for NullTxApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TxApi for NullTxApi {
    async fn recent_blockhash(&self) -> Result<RecentBlockhash, WalletError> {
        let n = self.blockhash_calls.fetch_add(1, Ordering::SeqCst);
        if *self.blockhash_fails.lock().unwrap() {
            return Err(WalletError::Api("Failed to fetch blockhash".into()));
        }
        // A new hash per call, so re-signing is observable.
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&(n + 1).to_le_bytes());
        Ok(RecentBlockhash {
            blockhash: Hash::new_from_array(bytes).to_string(),
            last_valid_block_height: 1_000 + u64::from(n),
        })
    }

    async fn broadcast(&self, req: &BroadcastRequest) -> Result<String, BroadcastFailure> {
        let mut requests = self.requests.lock().unwrap();
        requests.push(req.clone());
        let scripted = self.results.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| Ok(format!("nulltx{}", requests.len())))
    }

    async fn history(&self, _pubkey: &str) -> Result<Vec<BurnHistoryRecord>, WalletError> {
        Ok(self.history.lock().unwrap().clone())
    }
}
