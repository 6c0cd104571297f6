//! Nullable wallet: scripted signing results, counted calls.

use async_trait::async_trait;
use devflation_wallet_core::{TransactionSigner, WalletAdapter, WalletErrorInfo};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

/// A wallet backed by a throwaway keypair.
///
/// With no scripted results it signs everything. Queued errors are returned
/// one per call, in order.
pub struct NullWallet {
    keypair: Keypair,
    connected: bool,
    can_sign: bool,
    results: Mutex<VecDeque<Result<(), WalletErrorInfo>>>,
    sign_calls: AtomicU32,
}

impl NullWallet {
    pub fn new() -> Self {
        Self {
            keypair: Keypair::new(),
            connected: true,
            can_sign: true,
            results: Mutex::new(VecDeque::new()),
            sign_calls: AtomicU32::new(0),
        }
    }

    /// A wallet that exposes no signing capability.
    pub fn without_signer() -> Self {
        Self {
            can_sign: false,
            ..Self::new()
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            ..Self::new()
        }
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }

    /// Make the next signing call fail with `err`.
    pub fn fail_next(&self, err: WalletErrorInfo) {
        self.results.lock().unwrap().push_back(Err(err));
    }

    /// Let the next signing call succeed (useful between queued failures).
    pub fn sign_next(&self) {
        self.results.lock().unwrap().push_back(Ok(()));
    }

    pub fn sign_calls(&self) -> u32 {
        self.sign_calls.load(Ordering::SeqCst)
    }
}

impl Default for NullWallet {
    fn default() -> Self {
        Self::new()
    }
}

impl WalletAdapter for NullWallet {
    fn public_key(&self) -> Option<Pubkey> {
        self.connected.then(|| self.keypair.pubkey())
    }

    fn signer(&self) -> Option<&dyn TransactionSigner> {
        if self.can_sign {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl TransactionSigner for NullWallet {
    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction, WalletErrorInfo> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.results.lock().unwrap().pop_front();
        if let Some(Err(err)) = scripted {
            return Err(err);
        }
        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletErrorInfo::new(e.to_string()))?;
        Ok(tx)
    }
}
