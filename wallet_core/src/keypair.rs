//! A local keypair file as a wallet, for the command-line client.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{read_keypair_file, Keypair};
use solana_sdk::signer::Signer;
use solana_sdk::transaction::Transaction;
use std::path::Path;

use crate::error::WalletError;
use crate::signing::{TransactionSigner, WalletAdapter, WalletErrorInfo};

pub struct KeypairWallet {
    keypair: Keypair,
}

impl KeypairWallet {
    pub fn new(keypair: Keypair) -> Self {
        Self { keypair }
    }

    /// Load a Solana CLI keypair file (JSON array of 64 bytes).
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, WalletError> {
        let path = path.as_ref();
        let keypair = read_keypair_file(path)
            .map_err(|e| WalletError::Keypair(format!("{}: {e}", path.display())))?;
        Ok(Self { keypair })
    }

    pub fn pubkey(&self) -> Pubkey {
        self.keypair.pubkey()
    }
}

impl WalletAdapter for KeypairWallet {
    fn public_key(&self) -> Option<Pubkey> {
        Some(self.keypair.pubkey())
    }

    fn signer(&self) -> Option<&dyn TransactionSigner> {
        Some(self)
    }
}

#[async_trait]
impl TransactionSigner for KeypairWallet {
    async fn sign_transaction(&self, mut tx: Transaction) -> Result<Transaction, WalletErrorInfo> {
        let blockhash = tx.message.recent_blockhash;
        tx.try_sign(&[&self.keypair], blockhash)
            .map_err(|e| WalletErrorInfo::new(e.to_string()).with_name("SignerError"))?;
        Ok(tx)
    }
}
