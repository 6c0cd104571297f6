//! Signing adapter: delegates to a wallet and classifies what came back.
//!
//! Wallets disagree on how they report that the user declined a signature
//! (an error message, an error name, or a numeric code). The markers below
//! are the known variants; anything that matches one of them is a
//! cancellation, not a failure.

use async_trait::async_trait;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::Transaction;
use std::error::Error;
use std::fmt;
use tracing::{info, warn};

/// Lowercased substrings of a wallet error message that mean "user declined".
pub const REJECTION_MESSAGE_MARKERS: &[&str] = &["rejected", "user rejected", "cancelled"];

/// Lowercased substrings of a wallet error name that mean "user declined".
pub const REJECTION_NAME_MARKERS: &[&str] = &["walletsigntransactionerror", "userrejected"];

/// Numeric codes wallets use for "user declined" (EIP-1193 style and legacy).
pub const REJECTION_CODES: &[i64] = &[4001, 1];

/// Codes for "this wallet does not implement the method".
pub const UNSUPPORTED_CODES: &[i64] = &[4200, -32601];

/// Shown for every cancellation, whatever the wallet said.
pub const SIGNATURE_CANCELLED_NOTICE: &str = "Signature cancelled. No tokens were burned.";

pub const UNSUPPORTED_WALLET_NOTICE: &str =
    "This wallet cannot sign transactions. Connect a wallet that supports signing.";

/// A wallet error reduced to the three fields used for classification.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WalletErrorInfo {
    pub message: String,
    pub name: Option<String>,
    pub code: Option<i64>,
}

impl WalletErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = Some(code);
        self
    }

    pub fn is_user_rejection(&self) -> bool {
        message_is_rejection(&self.message)
            || self.name.as_deref().is_some_and(|name| {
                let name = name.to_ascii_lowercase();
                REJECTION_NAME_MARKERS.iter().any(|m| name.contains(m))
            })
            || self.code.is_some_and(|code| REJECTION_CODES.contains(&code))
    }
}

impl fmt::Display for WalletErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.name, self.message.is_empty()) {
            (Some(name), true) => f.write_str(name),
            (Some(name), false) => write!(f, "{name}: {}", self.message),
            (None, _) => f.write_str(&self.message),
        }?;
        if let Some(code) = self.code {
            write!(f, " (code {code})")?;
        }
        Ok(())
    }
}

impl Error for WalletErrorInfo {}

fn message_is_rejection(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    REJECTION_MESSAGE_MARKERS.iter().any(|m| message.contains(m))
}

/// The part of a wallet that can sign.
#[async_trait]
pub trait TransactionSigner: Send + Sync {
    /// Add the wallet's signature. `tx` already carries its blockhash.
    async fn sign_transaction(&self, tx: Transaction) -> Result<Transaction, WalletErrorInfo>;
}

/// A connected (or disconnected) wallet.
pub trait WalletAdapter: Send + Sync {
    fn public_key(&self) -> Option<Pubkey>;

    /// `None` when the wallet exposes no signing capability at all.
    fn signer(&self) -> Option<&dyn TransactionSigner>;
}

/// Closed classification of a wallet error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignErrorClass {
    UserRejected,
    Unsupported,
    Other,
}

pub fn classify(err: &WalletErrorInfo) -> SignErrorClass {
    if err.is_user_rejection() {
        SignErrorClass::UserRejected
    } else if err.code.is_some_and(|code| UNSUPPORTED_CODES.contains(&code)) {
        SignErrorClass::Unsupported
    } else {
        SignErrorClass::Other
    }
}

#[derive(Debug)]
pub enum SignOutcome {
    Signed(Transaction),
    UserRejected,
    Unsupported,
    Failed(String),
}

impl SignOutcome {
    /// What to tell the user when signing did not produce a transaction.
    pub fn notice(&self) -> Option<String> {
        match self {
            SignOutcome::Signed(_) => None,
            SignOutcome::UserRejected => Some(SIGNATURE_CANCELLED_NOTICE.to_string()),
            SignOutcome::Unsupported => Some(UNSUPPORTED_WALLET_NOTICE.to_string()),
            SignOutcome::Failed(detail) => Some(detail.clone()),
        }
    }
}

/// Ask `wallet` to sign `tx` and classify the result.
pub async fn sign_with(wallet: &dyn WalletAdapter, tx: Transaction) -> SignOutcome {
    let Some(signer) = wallet.signer() else {
        warn!("connected wallet has no signing capability");
        return SignOutcome::Unsupported;
    };
    match signer.sign_transaction(tx).await {
        Ok(signed) => SignOutcome::Signed(signed),
        Err(err) => match classify(&err) {
            SignErrorClass::UserRejected => {
                info!("user declined the signature request");
                SignOutcome::UserRejected
            }
            SignErrorClass::Unsupported => {
                warn!(error = %err, "wallet does not implement transaction signing");
                SignOutcome::Unsupported
            }
            SignErrorClass::Other => {
                warn!(error = %err, "wallet failed to sign");
                SignOutcome::Failed(err.to_string())
            }
        },
    }
}

/// Walk an error chain looking for a wallet cancellation.
///
/// Used by top-level error handlers so a cancellation that escaped the
/// typed outcomes is still reported as a cancellation.
pub fn is_user_rejection(err: &(dyn Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(info) = e.downcast_ref::<WalletErrorInfo>() {
            if info.is_user_rejection() {
                return true;
            }
        } else if message_is_rejection(&e.to_string()) {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_markers_are_case_insensitive() {
        assert!(WalletErrorInfo::new("User Rejected the request").is_user_rejection());
        assert!(WalletErrorInfo::new("Transaction cancelled").is_user_rejection());
        assert!(!WalletErrorInfo::new("insufficient funds").is_user_rejection());
    }

    #[test]
    fn name_and_code_markers() {
        let by_name = WalletErrorInfo::default().with_name("WalletSignTransactionError");
        assert_eq!(classify(&by_name), SignErrorClass::UserRejected);
        let by_code = WalletErrorInfo::default().with_code(4001);
        assert_eq!(classify(&by_code), SignErrorClass::UserRejected);
        let other_code = WalletErrorInfo::new("boom").with_code(-32603);
        assert_eq!(classify(&other_code), SignErrorClass::Other);
        let missing = WalletErrorInfo::new("method not found").with_code(-32601);
        assert_eq!(classify(&missing), SignErrorClass::Unsupported);
    }

    #[test]
    fn display_includes_name_and_code() {
        let err = WalletErrorInfo::new("bad").with_name("WalletError").with_code(7);
        assert_eq!(err.to_string(), "WalletError: bad (code 7)");
    }

    #[derive(Debug)]
    struct Wrapper(WalletErrorInfo);

    impl fmt::Display for Wrapper {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("burn aborted")
        }
    }

    impl Error for Wrapper {
        fn source(&self) -> Option<&(dyn Error + 'static)> {
            Some(&self.0)
        }
    }

    #[test]
    fn rejection_is_found_through_source_chain() {
        let wrapped = Wrapper(WalletErrorInfo::default().with_code(4001));
        assert!(is_user_rejection(&wrapped));

        let unrelated = Wrapper(WalletErrorInfo::new("node unreachable"));
        assert!(!is_user_rejection(&unrelated));
    }
}
