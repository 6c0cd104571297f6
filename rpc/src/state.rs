//! Shared handler state.

use devflation_chain::SolanaRpc;
use devflation_oracle::PriceOracle;
use devflation_store::HistoryStore;
use std::sync::Arc;

use crate::confirmer::ConfirmationQueue;
use crate::metrics::ApiMetrics;

/// Everything a request handler can reach. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub chain: Arc<dyn SolanaRpc>,
    pub store: Arc<dyn HistoryStore>,
    pub oracle: Arc<PriceOracle>,
    pub confirmations: ConfirmationQueue,
    pub metrics: Option<Arc<ApiMetrics>>,
}

impl AppState {
    pub(crate) fn count(&self, f: impl FnOnce(&ApiMetrics)) {
        if let Some(m) = &self.metrics {
            f(m);
        }
    }
}
