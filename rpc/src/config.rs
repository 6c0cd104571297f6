//! API server configuration with TOML file support.

use devflation_oracle::OracleEndpoints;
use devflation_utils::LogFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::ServerError;

/// Configuration for the HTTP API server.
///
/// Loaded from a TOML file via [`ApiConfig::from_toml_file`]; every field has
/// a default so an empty file is valid.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Socket address the HTTP server binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Solana JSON-RPC endpoint used for blockhashes, broadcasts and reads.
    #[serde(default = "default_rpc_url")]
    pub solana_rpc_url: String,

    /// Directory holding the `<pubkey>.burns.json` history files.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_price_cache_ttl_secs")]
    pub price_cache_ttl_secs: u64,

    /// Interval between signature-status polls in the confirmation worker.
    #[serde(default = "default_confirm_poll_interval_ms")]
    pub confirm_poll_interval_ms: u64,

    /// How long the worker waits for finalization before giving up.
    #[serde(default = "default_confirm_timeout_secs")]
    pub confirm_timeout_secs: u64,

    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_true")]
    pub enable_metrics: bool,

    /// Allowed CORS origins. Empty disables CORS headers; `"*"` allows any.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default)]
    pub oracle: OracleEndpoints,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_rpc_url() -> String {
    "https://api.mainnet-beta.solana.com".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_price_cache_ttl_secs() -> u64 {
    15
}

fn default_confirm_poll_interval_ms() -> u64 {
    2000
}

fn default_confirm_timeout_secs() -> u64 {
    90
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ApiConfig {
    pub fn from_toml_file(path: &str) -> Result<Self, ServerError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ServerError::Config(format!("{path}: {e}")))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, ServerError> {
        toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("ApiConfig is always serializable to TOML")
    }

    pub fn price_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.price_cache_ttl_secs)
    }

    pub fn confirm_poll_interval(&self) -> Duration {
        Duration::from_millis(self.confirm_poll_interval_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_secs(self.confirm_timeout_secs)
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            solana_rpc_url: default_rpc_url(),
            data_dir: default_data_dir(),
            price_cache_ttl_secs: default_price_cache_ttl_secs(),
            confirm_poll_interval_ms: default_confirm_poll_interval_ms(),
            confirm_timeout_secs: default_confirm_timeout_secs(),
            log_format: LogFormat::default(),
            log_level: default_log_level(),
            enable_metrics: default_true(),
            cors_origins: Vec::new(),
            oracle: OracleEndpoints::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = ApiConfig::default();
        let parsed = ApiConfig::from_toml_str(&config.to_toml_string()).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = ApiConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config.listen_addr, "0.0.0.0:3000");
        assert_eq!(config.price_cache_ttl(), Duration::from_secs(15));
        assert_eq!(config.confirm_poll_interval(), Duration::from_secs(2));
        assert_eq!(config.log_format, LogFormat::Human);
        assert!(config.enable_metrics);
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            solana_rpc_url = "http://127.0.0.1:8899"
            log_format = "json"

            [oracle]
            coingecko_url = "http://localhost:9000"
        "#;
        let config = ApiConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.solana_rpc_url, "http://127.0.0.1:8899");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.oracle.coingecko_url, "http://localhost:9000");
        assert_eq!(
            config.oracle.jupiter_price_url,
            OracleEndpoints::default().jupiter_price_url
        );
    }

    #[test]
    fn missing_file_returns_config_error() {
        let err = ApiConfig::from_toml_file("/nonexistent/devflation.toml").unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
