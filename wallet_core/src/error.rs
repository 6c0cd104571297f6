use devflation_chain::ChainError;
use devflation_types::AmountError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid amount: {0}")]
    Amount(#[from] AmountError),

    #[error("burn not acknowledged: confirm that burned tokens cannot be recovered")]
    NotAcknowledged,

    #[error("a burn is already in progress")]
    BurnInProgress,

    #[error("no wallet connected")]
    NotConnected,

    #[error("connected wallet {connected} does not own this burn ({owner})")]
    OwnerMismatch { connected: String, owner: String },

    #[error("transaction building error: {0}")]
    TransactionBuild(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("keypair error: {0}")]
    Keypair(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),
}
