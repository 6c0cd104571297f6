//! Prometheus metrics for the API server.
//!
//! [`ApiMetrics`] owns its own [`Registry`], encoded by `GET /metrics`.

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct ApiMetrics {
    pub registry: Registry,

    // ── Broadcast ───────────────────────────────────────────────────────
    /// Transactions accepted by the RPC node.
    pub broadcasts: IntCounter,
    /// Broadcasts refused because the blockhash expired.
    pub broadcasts_blockhash_expired: IntCounter,
    /// Broadcasts refused for any other reason.
    pub broadcasts_rejected: IntCounter,
    pub history_write_failures: IntCounter,

    // ── Confirmation ────────────────────────────────────────────────────
    pub confirmations_confirmed: IntCounter,
    pub confirmations_failed: IntCounter,
    pub confirmations_timed_out: IntCounter,
    /// Confirmations currently being polled by the worker.
    pub confirmations_in_flight: IntGauge,
}

impl ApiMetrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let broadcasts = register_int_counter_with_registry!(
            Opts::new("devflation_broadcasts_total", "Transactions accepted by the RPC node"),
            registry
        )
        .expect("failed to register broadcasts counter");

        let broadcasts_blockhash_expired = register_int_counter_with_registry!(
            Opts::new(
                "devflation_broadcasts_blockhash_expired_total",
                "Broadcasts refused with an expired blockhash"
            ),
            registry
        )
        .expect("failed to register broadcasts_blockhash_expired counter");

        let broadcasts_rejected = register_int_counter_with_registry!(
            Opts::new(
                "devflation_broadcasts_rejected_total",
                "Broadcasts refused by the RPC node for other reasons"
            ),
            registry
        )
        .expect("failed to register broadcasts_rejected counter");

        let history_write_failures = register_int_counter_with_registry!(
            Opts::new(
                "devflation_history_write_failures_total",
                "History records that could not be persisted"
            ),
            registry
        )
        .expect("failed to register history_write_failures counter");

        let confirmations_confirmed = register_int_counter_with_registry!(
            Opts::new(
                "devflation_confirmations_confirmed_total",
                "Transactions finalized without error"
            ),
            registry
        )
        .expect("failed to register confirmations_confirmed counter");

        let confirmations_failed = register_int_counter_with_registry!(
            Opts::new(
                "devflation_confirmations_failed_total",
                "Transactions that failed on chain"
            ),
            registry
        )
        .expect("failed to register confirmations_failed counter");

        let confirmations_timed_out = register_int_counter_with_registry!(
            Opts::new(
                "devflation_confirmations_timed_out_total",
                "Confirmations abandoned after the timeout"
            ),
            registry
        )
        .expect("failed to register confirmations_timed_out counter");

        let confirmations_in_flight = register_int_gauge_with_registry!(
            Opts::new(
                "devflation_confirmations_in_flight",
                "Confirmations currently being polled"
            ),
            registry
        )
        .expect("failed to register confirmations_in_flight gauge");

        Self {
            registry,
            broadcasts,
            broadcasts_blockhash_expired,
            broadcasts_rejected,
            history_write_failures,
            confirmations_confirmed,
            confirmations_failed,
            confirmations_timed_out,
            confirmations_in_flight,
        }
    }

    /// Encode every metric in the Prometheus text format.
    pub fn encode(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            tracing::error!(error = %e, "failed to encode metrics");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

impl Default for ApiMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_appear_in_text_output() {
        let metrics = ApiMetrics::new();
        metrics.broadcasts.inc();
        metrics.broadcasts_blockhash_expired.inc_by(2);
        let text = metrics.encode();
        assert!(text.contains("devflation_broadcasts_total 1"));
        assert!(text.contains("devflation_broadcasts_blockhash_expired_total 2"));
    }
}
