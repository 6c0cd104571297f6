//! Wallet-change notifications.
//!
//! Connect, disconnect and account switches are published on a `watch`
//! channel. Listeners that hold per-wallet state subscribe and reset it.

use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::api::WalletCache;
use crate::status::StatusBoard;

pub struct WalletEvents {
    current: watch::Sender<Option<Pubkey>>,
}

impl WalletEvents {
    pub fn new(initial: Option<Pubkey>) -> Self {
        let (current, _) = watch::channel(initial);
        Self { current }
    }

    pub fn current(&self) -> Option<Pubkey> {
        *self.current.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Pubkey>> {
        self.current.subscribe()
    }

    /// Publish the connected wallet. Returns `false` when nothing changed.
    pub fn notify(&self, wallet: Option<Pubkey>) -> bool {
        self.current.send_if_modified(|current| {
            if *current == wallet {
                false
            } else {
                *current = wallet;
                true
            }
        })
    }
}

/// Clear client caches and the status banner on every wallet change.
pub fn spawn_cleanup(
    mut changes: watch::Receiver<Option<Pubkey>>,
    cache: Arc<WalletCache>,
    board: Arc<StatusBoard>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let wallet = *changes.borrow_and_update();
            debug!(wallet = ?wallet, "wallet changed, clearing client state");
            cache.clear();
            board.dismiss();
        }
    })
}
