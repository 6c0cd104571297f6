//! Burn history storage.
//!
//! One logical collection per wallet, one record per mint inside it. A new
//! record for the same `(wallet, mint)` replaces the old one. Backends
//! implement [`HistoryStore`]; the rest of the workspace depends only on the
//! trait.

pub mod error;
pub mod file;
pub mod history;

pub use error::StoreError;
pub use file::FileHistoryStore;
pub use history::{apply_status, pending_in, upsert_into, HistoryStore, PendingEntry};
