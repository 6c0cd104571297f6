//! HTTP API for the Devflation burn pipeline.
//!
//! Endpoints:
//! - `GET  /api/tx/recent-blockhash`
//! - `POST /api/tx/broadcast`
//! - `GET  /api/tx/history?pubkey=`
//! - `GET  /api/solana-tokens?publicKey=`
//! - `GET  /api/solana-balance?publicKey=`
//! - `GET  /api/price?mint=&symbol=&quote=`
//! - `GET  /metrics`

pub mod broadcast;
pub mod config;
pub mod confirmer;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod server;
pub mod shutdown;
pub mod state;

pub use config::ApiConfig;
pub use confirmer::{ConfirmationJob, ConfirmationQueue, ConfirmationResult, ConfirmationWorker};
pub use error::{ApiError, ServerError};
pub use metrics::ApiMetrics;
pub use server::{router, ApiServer};
pub use shutdown::{ShutdownController, ShutdownSignal};
pub use state::AppState;
