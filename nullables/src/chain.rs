//! Nullable Solana node: scripted answers, recorded submissions.

use async_trait::async_trait;
use devflation_chain::{ChainError, Commitment, SignatureStatus, SolanaRpc, TokenAccount};
use devflation_types::RecentBlockhash;
use solana_sdk::hash::Hash;
use solana_sdk::transaction::Transaction;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

pub type StatusStep = Result<Option<SignatureStatus>, ChainError>;

/// A status at the given commitment with no error.
pub fn status(commitment: Commitment) -> SignatureStatus {
    SignatureStatus {
        slot: 1,
        confirmations: None,
        err: None,
        confirmation_status: Some(commitment),
    }
}

/// A finalized status carrying an on-chain error.
pub fn failed_status(err: serde_json::Value) -> SignatureStatus {
    SignatureStatus {
        err: Some(err),
        ..status(Commitment::Finalized)
    }
}

pub struct NullChain {
    blockhash: Mutex<Result<RecentBlockhash, ChainError>>,
    send_results: Mutex<VecDeque<Result<String, ChainError>>>,
    sent: Mutex<Vec<Vec<u8>>>,
    statuses: Mutex<HashMap<String, VecDeque<StatusStep>>>,
    status_calls: Mutex<HashMap<String, u32>>,
    accounts: Mutex<HashMap<String, bool>>,
    account_lookup_fails: AtomicBool,
    account_lookups: AtomicU32,
    balances: Mutex<HashMap<String, u64>>,
    token_accounts: Mutex<HashMap<String, Vec<TokenAccount>>>,
    decimals: Mutex<HashMap<String, u8>>,
}

impl NullChain {
    pub fn new() -> Self {
        Self {
            blockhash: Mutex::new(Ok(RecentBlockhash {
                blockhash: Hash::new_from_array([7; 32]).to_string(),
                last_valid_block_height: 1_000,
            })),
            send_results: Mutex::new(VecDeque::new()),
            sent: Mutex::new(Vec::new()),
            statuses: Mutex::new(HashMap::new()),
            status_calls: Mutex::new(HashMap::new()),
            accounts: Mutex::new(HashMap::new()),
            account_lookup_fails: AtomicBool::new(false),
            account_lookups: AtomicU32::new(0),
            balances: Mutex::new(HashMap::new()),
            token_accounts: Mutex::new(HashMap::new()),
            decimals: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_blockhash(&self, hash: Hash, last_valid_block_height: u64) {
        *self.blockhash.lock().unwrap() = Ok(RecentBlockhash {
            blockhash: hash.to_string(),
            last_valid_block_height,
        });
    }

    pub fn fail_blockhash(&self, message: &str) {
        *self.blockhash.lock().unwrap() = Err(ChainError::Transport(message.to_string()));
    }

    /// Queue the result of the next `sendTransaction`. With an empty queue the
    /// node accepts and answers with the transaction's first signature.
    pub fn push_send_result(&self, result: Result<String, ChainError>) {
        self.send_results.lock().unwrap().push_back(result);
    }

    /// Queue a node-side rejection with the given message.
    pub fn reject_next_send(&self, message: &str) {
        self.push_send_result(Err(ChainError::Rpc {
            code: -32002,
            message: message.to_string(),
        }));
    }

    /// Raw transactions submitted so far.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_transactions(&self) -> Vec<Transaction> {
        self.sent()
            .iter()
            .filter_map(|bytes| bincode::deserialize(bytes).ok())
            .collect()
    }

    /// Script the answers to `getSignatureStatuses` for `txid`, one per
    /// call. The last answer repeats; an unscripted txid is never seen.
    pub fn script_statuses(&self, txid: &str, steps: Vec<StatusStep>) {
        self.statuses
            .lock()
            .unwrap()
            .insert(txid.to_string(), steps.into());
    }

    pub fn set_status(&self, txid: &str, status: SignatureStatus) {
        self.script_statuses(txid, vec![Ok(Some(status))]);
    }

    pub fn status_calls(&self, txid: &str) -> u32 {
        self.status_calls.lock().unwrap().get(txid).copied().unwrap_or(0)
    }

    pub fn set_account_exists(&self, address: &str, exists: bool) {
        self.accounts.lock().unwrap().insert(address.to_string(), exists);
    }

    pub fn fail_account_lookups(&self, fail: bool) {
        self.account_lookup_fails.store(fail, Ordering::SeqCst);
    }

    pub fn account_lookups(&self) -> u32 {
        self.account_lookups.load(Ordering::SeqCst)
    }

    pub fn set_balance(&self, address: &str, lamports: u64) {
        self.balances.lock().unwrap().insert(address.to_string(), lamports);
    }

    pub fn set_token_accounts(&self, owner: &str, accounts: Vec<TokenAccount>) {
        self.token_accounts
            .lock()
            .unwrap()
            .insert(owner.to_string(), accounts);
    }

    pub fn set_decimals(&self, mint: &str, decimals: u8) {
        self.decimals.lock().unwrap().insert(mint.to_string(), decimals);
    }
}

impl Default for NullChain {
    fn default() -> Self {
        Self::new()
    }
}

fn first_signature(tx: &[u8]) -> Option<String> {
    let tx: Transaction = bincode::deserialize(tx).ok()?;
    tx.signatures.first().map(|s| s.to_string())
}

#[async_trait]
impl SolanaRpc for NullChain {
    async fn latest_blockhash(&self, _commitment: Commitment) -> Result<RecentBlockhash, ChainError> {
        self.blockhash.lock().unwrap().clone()
    }

    async fn send_raw_transaction(&self, tx: &[u8]) -> Result<String, ChainError> {
        let scripted = self.send_results.lock().unwrap().pop_front();
        let mut sent = self.sent.lock().unwrap();
        sent.push(tx.to_vec());
        match scripted {
            Some(result) => result,
            None => Ok(first_signature(tx).unwrap_or_else(|| format!("nulltx{}", sent.len()))),
        }
    }

    async fn signature_status(&self, txid: &str) -> Result<Option<SignatureStatus>, ChainError> {
        *self
            .status_calls
            .lock()
            .unwrap()
            .entry(txid.to_string())
            .or_default() += 1;
        let mut statuses = self.statuses.lock().unwrap();
        match statuses.get_mut(txid) {
            Some(steps) if steps.len() > 1 => steps.pop_front().unwrap_or(Ok(None)),
            Some(steps) => steps.front().cloned().unwrap_or(Ok(None)),
            None => Ok(None),
        }
    }

    async fn account_exists(&self, address: &str) -> Result<bool, ChainError> {
        self.account_lookups.fetch_add(1, Ordering::SeqCst);
        if self.account_lookup_fails.load(Ordering::SeqCst) {
            return Err(ChainError::Transport("account lookup failed".into()));
        }
        Ok(self.accounts.lock().unwrap().get(address).copied().unwrap_or(false))
    }

    async fn balance(&self, address: &str) -> Result<u64, ChainError> {
        Ok(self.balances.lock().unwrap().get(address).copied().unwrap_or(0))
    }

    async fn token_accounts_by_owner(&self, owner: &str) -> Result<Vec<TokenAccount>, ChainError> {
        Ok(self
            .token_accounts
            .lock()
            .unwrap()
            .get(owner)
            .cloned()
            .unwrap_or_default())
    }

    async fn token_decimals(&self, mint: &str) -> Result<u8, ChainError> {
        self.decimals
            .lock()
            .unwrap()
            .get(mint)
            .copied()
            .ok_or_else(|| ChainError::Rpc {
                code: -32602,
                message: format!("Invalid param: could not find mint {mint}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn last_scripted_status_repeats() {
        let chain = NullChain::new();
        chain.script_statuses(
            "sig",
            vec![Ok(None), Ok(Some(status(Commitment::Finalized)))],
        );
        assert_eq!(chain.signature_status("sig").await.unwrap(), None);
        assert!(chain.signature_status("sig").await.unwrap().is_some());
        assert!(chain.signature_status("sig").await.unwrap().is_some());
        assert_eq!(chain.status_calls("sig"), 3);
    }

    #[tokio::test]
    async fn scripted_rejection_is_consumed_once() {
        let chain = NullChain::new();
        chain.reject_next_send("Blockhash not found");
        assert!(chain.send_raw_transaction(b"x").await.is_err());
        assert_eq!(chain.send_raw_transaction(b"y").await.unwrap(), "nulltx2");
        assert_eq!(chain.sent().len(), 2);
    }
}
