//! The transaction status banner.

use devflation_types::TxStatus;
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Latest burn status plus the poll that is updating it.
///
/// Dismissing the status also stops its poll.
pub struct StatusBoard {
    status: watch::Sender<Option<TxStatus>>,
    poll: Mutex<Option<AbortHandle>>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (status, _) = watch::channel(None);
        Self {
            status,
            poll: Mutex::new(None),
        }
    }

    pub fn current(&self) -> Option<TxStatus> {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<TxStatus>> {
        self.status.subscribe()
    }

    pub fn set(&self, status: TxStatus) {
        self.status.send_replace(Some(status));
    }

    /// Attach the poll driving the current status, stopping any earlier one.
    pub fn track(&self, poll: AbortHandle) {
        if let Ok(mut slot) = self.poll.lock() {
            if let Some(previous) = slot.replace(poll) {
                previous.abort();
            }
        }
    }

    /// Clear the banner and stop its poll.
    pub fn dismiss(&self) {
        if let Ok(mut slot) = self.poll.lock() {
            if let Some(poll) = slot.take() {
                poll.abort();
            }
        }
        self.status.send_replace(None);
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devflation_types::BurnMethod;
    use std::time::Duration;

    #[tokio::test]
    async fn dismiss_stops_the_tracked_poll() {
        let board = StatusBoard::new();
        let task = tokio::spawn(async { tokio::time::sleep(Duration::from_secs(60)).await });
        board.set(TxStatus::pending("sig", BurnMethod::Burn));
        board.track(task.abort_handle());

        board.dismiss();
        assert!(board.current().is_none());
        assert!(task.await.unwrap_err().is_cancelled());
    }

    #[tokio::test]
    async fn subscribers_see_updates() {
        let board = StatusBoard::new();
        let mut rx = board.subscribe();
        board.set(TxStatus::confirmed("sig", BurnMethod::Burn));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().as_ref().map(|s| s.txid.as_str()), Some("sig"));
    }
}
