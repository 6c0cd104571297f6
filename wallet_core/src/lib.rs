//! Client side of the burn pipeline.
//!
//! - [`builder`]: burn and incinerator transactions
//! - [`signing`]: wallet abstraction and cancellation classification
//! - [`api`]: HTTP client for the burn API
//! - [`retry`]: broadcast with a single blockhash retry
//! - [`poller`]: confirmation polling
//! - [`flow`]: the whole burn, driving the [`status`] banner

pub mod api;
pub mod builder;
pub mod error;
pub mod events;
pub mod flow;
pub mod keypair;
pub mod poller;
pub mod retry;
pub mod signing;
pub mod status;

pub use api::{ApiClient, BroadcastFailure, TxApi, WalletCache, WALLET_CACHE_TTL};
pub use builder::{parse_pubkey, BurnRequest, TransactionBuilder, UnsignedTransaction, INCINERATOR};
pub use error::WalletError;
pub use events::{spawn_cleanup, WalletEvents};
pub use flow::{BurnFlow, BurnReport, FlowConfig};
pub use keypair::KeypairWallet;
pub use poller::{ConfirmationPoller, PollHandle, PollOutcome, PollerConfig, TIMEOUT_MESSAGE};
pub use retry::{RetryCoordinator, SubmitContext, SubmitOutcome, MAX_BLOCKHASH_RETRIES};
pub use signing::{
    classify, is_user_rejection, sign_with, SignErrorClass, SignOutcome, TransactionSigner,
    WalletAdapter, WalletErrorInfo, SIGNATURE_CANCELLED_NOTICE, UNSUPPORTED_WALLET_NOTICE,
};
pub use status::StatusBoard;
