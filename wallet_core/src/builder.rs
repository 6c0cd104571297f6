//! Transaction builder: turns a burn request into an unsigned transaction.
//!
//! `Burn` emits a single SPL Token `Burn` instruction against the owner's
//! associated token account. `SendToIncinerator` transfers to the
//! incinerator's associated token account, prefixed by an idempotent
//! create-account instruction whenever that account is not known to exist.

use devflation_chain::SolanaRpc;
use devflation_types::{BurnMethod, TokenAmount};
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use spl_associated_token_account::instruction::create_associated_token_account_idempotent;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::WalletError;

/// Tokens sent here can never be moved again.
pub const INCINERATOR: Pubkey = solana_sdk::pubkey!("1nc1nerator11111111111111111111111111111111");

pub fn parse_pubkey(s: &str) -> Result<Pubkey, WalletError> {
    Pubkey::from_str(s.trim()).map_err(|_| WalletError::InvalidAddress(s.to_string()))
}

/// A validated request to dispose of tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BurnRequest {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: TokenAmount,
    pub method: BurnMethod,
    /// The user confirmed that the tokens are gone for good.
    pub acknowledged: bool,
}

impl BurnRequest {
    /// Parse a user-entered amount. Amounts that round to zero base units
    /// are rejected.
    pub fn new(
        mint: Pubkey,
        owner: Pubkey,
        amount_display: &str,
        decimals: u8,
        method: BurnMethod,
    ) -> Result<Self, WalletError> {
        Ok(Self {
            mint,
            owner,
            amount: TokenAmount::parse_display(amount_display, decimals)?,
            method,
            acknowledged: false,
        })
    }

    pub fn acknowledge(mut self) -> Self {
        self.acknowledged = true;
        self
    }
}

/// Instructions plus fee payer, waiting for a blockhash and a signature.
#[derive(Clone, Debug, PartialEq)]
pub struct UnsignedTransaction {
    instructions: Vec<Instruction>,
    fee_payer: Pubkey,
    recent_blockhash: Option<Hash>,
}

impl UnsignedTransaction {
    pub fn new(instructions: Vec<Instruction>, fee_payer: Pubkey) -> Self {
        Self {
            instructions,
            fee_payer,
            recent_blockhash: None,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn fee_payer(&self) -> Pubkey {
        self.fee_payer
    }

    pub fn recent_blockhash(&self) -> Option<Hash> {
        self.recent_blockhash
    }

    /// Replace the blockhash, e.g. before re-signing after it expired.
    pub fn set_blockhash(&mut self, blockhash: Hash) {
        self.recent_blockhash = Some(blockhash);
    }

    /// Compile into a wire transaction with empty signatures.
    pub fn to_transaction(&self) -> Result<Transaction, WalletError> {
        let blockhash = self
            .recent_blockhash
            .ok_or_else(|| WalletError::TransactionBuild("recent blockhash is not set".into()))?;
        let message = Message::new_with_blockhash(&self.instructions, Some(&self.fee_payer), &blockhash);
        Ok(Transaction::new_unsigned(message))
    }
}

pub struct TransactionBuilder {
    chain: Arc<dyn SolanaRpc>,
}

impl TransactionBuilder {
    /// `chain` is only used for the incinerator account existence check.
    pub fn new(chain: Arc<dyn SolanaRpc>) -> Self {
        Self { chain }
    }

    pub async fn build(&self, req: &BurnRequest) -> Result<UnsignedTransaction, WalletError> {
        let token_program = spl_token::id();
        let source = get_associated_token_address(&req.owner, &req.mint);
        let units = req.amount.units();

        let instructions = match req.method {
            BurnMethod::Burn => {
                let ix = spl_token::instruction::burn(&token_program, &source, &req.mint, &req.owner, &[], units)
                    .map_err(|e| WalletError::TransactionBuild(e.to_string()))?;
                vec![ix]
            }
            BurnMethod::SendToIncinerator => {
                let destination = get_associated_token_address(&INCINERATOR, &req.mint);
                let mut ixs = Vec::with_capacity(2);
                if !self.destination_exists(&destination).await {
                    ixs.push(create_associated_token_account_idempotent(
                        &req.owner,
                        &INCINERATOR,
                        &req.mint,
                        &token_program,
                    ));
                }
                let ix = spl_token::instruction::transfer_checked(
                    &token_program,
                    &source,
                    &req.mint,
                    &destination,
                    &req.owner,
                    &[],
                    units,
                    req.amount.decimals(),
                )
                .map_err(|e| WalletError::TransactionBuild(e.to_string()))?;
                ixs.push(ix);
                ixs
            }
        };

        debug!(
            mint = %req.mint,
            method = req.method.as_str(),
            units,
            instructions = instructions.len(),
            "built burn transaction"
        );
        Ok(UnsignedTransaction::new(instructions, req.owner))
    }

    /// A failed lookup counts as absent; the create instruction is idempotent.
    async fn destination_exists(&self, ata: &Pubkey) -> bool {
        match self.chain.account_exists(&ata.to_string()).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!(account = %ata, error = %e, "incinerator account lookup failed, adding create instruction");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incinerator_address_is_well_known() {
        assert_eq!(INCINERATOR.to_string(), "1nc1nerator11111111111111111111111111111111");
    }

    #[test]
    fn request_rejects_zero_unit_amounts() {
        let err = BurnRequest::new(
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            "0.0000001",
            6,
            BurnMethod::Burn,
        )
        .unwrap_err();
        assert!(matches!(err, WalletError::Amount(_)));
    }

    #[test]
    fn unsigned_transaction_requires_blockhash() {
        let payer = Pubkey::new_unique();
        let mut tx = UnsignedTransaction::new(Vec::new(), payer);
        assert!(tx.to_transaction().is_err());

        let hash = Hash::new_unique();
        tx.set_blockhash(hash);
        let compiled = tx.to_transaction().unwrap();
        assert_eq!(compiled.message.recent_blockhash, hash);
        assert_eq!(compiled.message.account_keys[0], payer);
    }

    #[test]
    fn bad_address_is_reported() {
        assert!(matches!(
            parse_pubkey("not-a-key"),
            Err(WalletError::InvalidAddress(_))
        ));
    }
}
