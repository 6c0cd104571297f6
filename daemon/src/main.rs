//! Devflation daemon: the burn API server and a command-line burn client.

use anyhow::{bail, Context};
use clap::Parser;
use devflation_chain::{JsonRpcClient, SolanaRpc};
use devflation_rpc::{ApiConfig, ApiServer, ShutdownController};
use devflation_types::{BurnMethod, Metadata};
use devflation_utils::{init_logging, LogFormat};
use devflation_wallet_core::{
    is_user_rejection, parse_pubkey, ApiClient, BurnFlow, BurnReport, BurnRequest, FlowConfig,
    KeypairWallet, TxApi, SIGNATURE_CANCELLED_NOTICE,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_API_URL: &str = "http://127.0.0.1:3000";
const DEFAULT_RPC_URL: &str = "https://api.mainnet-beta.solana.com";

#[derive(Parser)]
#[command(name = "devflation", about = "Burn SPL tokens and serve the burn API")]
struct Cli {
    /// Log level: "trace", "debug", "info", "warn", "error".
    /// Defaults to the config file for `serve` and to "warn" otherwise.
    #[arg(long, global = true, env = "DEVFLATION_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, global = true, env = "DEVFLATION_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve {
        /// Path to a TOML configuration file. CLI flags and env vars
        /// override its values.
        #[arg(long, env = "DEVFLATION_CONFIG")]
        config: Option<String>,

        /// Address to listen on, e.g. "0.0.0.0:3000".
        #[arg(long, env = "DEVFLATION_LISTEN_ADDR")]
        listen: Option<String>,

        /// Solana JSON-RPC endpoint.
        #[arg(long, env = "SOLANA_RPC_URL")]
        rpc_url: Option<String>,

        /// Directory holding the per-wallet history files.
        #[arg(long, env = "DEVFLATION_DATA_DIR")]
        data_dir: Option<PathBuf>,

        /// Allowed CORS origins (comma-separated, "*" for any).
        #[arg(long, env = "DEVFLATION_CORS_ORIGINS", value_delimiter = ',')]
        cors_origins: Vec<String>,

        /// Disable the Prometheus metrics endpoint.
        #[arg(long, env = "DEVFLATION_DISABLE_METRICS")]
        disable_metrics: bool,
    },

    /// Burn tokens with a local keypair through a running API.
    Burn {
        /// Solana CLI keypair file of the token owner.
        #[arg(long, env = "DEVFLATION_KEYPAIR")]
        keypair: PathBuf,

        /// Mint address of the token.
        #[arg(long)]
        mint: String,

        /// Amount in display units, e.g. "100.5".
        #[arg(long)]
        amount: String,

        /// Token decimals. Read from the mint when omitted.
        #[arg(long)]
        decimals: Option<u8>,

        /// "burn" destroys the tokens; "incinerate" sends them to the incinerator.
        #[arg(long, default_value = "burn")]
        method: BurnMethod,

        /// Confirm that burned tokens cannot be recovered.
        #[arg(long)]
        yes: bool,

        /// Return after the broadcast instead of waiting for confirmation.
        #[arg(long)]
        no_wait: bool,

        #[arg(long, default_value = DEFAULT_API_URL, env = "DEVFLATION_API_URL")]
        api_url: String,

        #[arg(long, default_value = DEFAULT_RPC_URL, env = "SOLANA_RPC_URL")]
        rpc_url: String,
    },

    /// Print the burn history of a wallet.
    History {
        #[arg(long)]
        pubkey: String,

        #[arg(long, default_value = DEFAULT_API_URL, env = "DEVFLATION_API_URL")]
        api_url: String,
    },

    /// Print the SPL tokens held by a wallet.
    Tokens {
        #[arg(long)]
        pubkey: String,

        #[arg(long, default_value = DEFAULT_API_URL, env = "DEVFLATION_API_URL")]
        api_url: String,
    },

    /// Print the default server configuration as TOML.
    DefaultConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match run(cli).await {
        // A cancelled signature is never a crash.
        Err(e) if e.chain().any(is_user_rejection) => {
            println!("{SIGNATURE_CANCELLED_NOTICE}");
            Ok(())
        }
        other => other,
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let log_format = cli.log_format;
    let log_level = cli.log_level;

    match cli.command {
        Command::Serve {
            config,
            listen,
            rpc_url,
            data_dir,
            cors_origins,
            disable_metrics,
        } => {
            let mut config = match config.as_deref() {
                Some(path) => ApiConfig::from_toml_file(path)
                    .with_context(|| format!("failed to load config from {path}"))?,
                None => ApiConfig::default(),
            };
            if let Some(listen) = listen {
                config.listen_addr = listen;
            }
            if let Some(rpc_url) = rpc_url {
                config.solana_rpc_url = rpc_url;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if !cors_origins.is_empty() {
                config.cors_origins = cors_origins;
            }
            if disable_metrics {
                config.enable_metrics = false;
            }

            init_logging(
                log_format.unwrap_or(config.log_format),
                log_level.as_deref().unwrap_or(&config.log_level),
            );
            tracing::info!(
                listen = %config.listen_addr,
                rpc = %config.solana_rpc_url,
                data_dir = %config.data_dir.display(),
                "starting Devflation API"
            );

            let shutdown = Arc::new(ShutdownController::new());
            let server = ApiServer::from_config(config).await?;
            let signals = {
                let shutdown = shutdown.clone();
                tokio::spawn(async move { shutdown.wait_for_signal().await })
            };
            server.start(&shutdown).await?;
            signals.abort();
            tracing::info!("Devflation API exited cleanly");
        }

        Command::Burn {
            keypair,
            mint,
            amount,
            decimals,
            method,
            yes,
            no_wait,
            api_url,
            rpc_url,
        } => {
            init_logging(log_format.unwrap_or_default(), log_level.as_deref().unwrap_or("warn"));
            if !yes {
                bail!("burned tokens cannot be recovered; pass --yes to confirm");
            }

            let wallet = KeypairWallet::from_file(&keypair)?;
            let mint = parse_pubkey(&mint)?;
            let chain = Arc::new(JsonRpcClient::new(&rpc_url)?);
            let decimals = match decimals {
                Some(d) => d,
                None => chain
                    .token_decimals(&mint.to_string())
                    .await
                    .context("could not read token decimals; pass --decimals")?,
            };
            let req = BurnRequest::new(mint, wallet.pubkey(), &amount, decimals, method)?.acknowledge();

            let api = Arc::new(ApiClient::new(&api_url)?);
            let metadata = token_metadata(&api, &req).await;
            let config = FlowConfig {
                api_url,
                rpc_url,
                wait_for_confirmation: !no_wait,
                ..FlowConfig::default()
            };
            let flow = BurnFlow::new(chain, api, &config);

            println!(
                "Burning {} of {} from {} ({})",
                req.amount,
                req.mint,
                req.owner,
                req.method
            );
            let report = flow.run(&wallet, &req, Some(metadata)).await?;
            println!("{}", report.message());
            match report {
                BurnReport::Failed { .. } => bail!("burn failed"),
                BurnReport::Finished {
                    outcome: devflation_wallet_core::PollOutcome::Failed(_),
                    ..
                } => bail!("burn failed on chain"),
                _ => {}
            }
        }

        Command::History { pubkey, api_url } => {
            init_logging(log_format.unwrap_or_default(), log_level.as_deref().unwrap_or("warn"));
            let api = ApiClient::new(&api_url)?;
            let burns = api.history(&pubkey).await?;
            println!("{}", serde_json::to_string_pretty(&json!({ "burns": burns }))?);
        }

        Command::Tokens { pubkey, api_url } => {
            init_logging(log_format.unwrap_or_default(), log_level.as_deref().unwrap_or("warn"));
            let api = ApiClient::new(&api_url)?;
            let tokens = api.solana_tokens(&pubkey).await?;
            println!("{}", serde_json::to_string_pretty(&json!({ "tokens": tokens }))?);
        }

        Command::DefaultConfig => {
            print!("{}", ApiConfig::default().to_toml_string());
        }
    }

    Ok(())
}

/// Display metadata stored with the history record. Best-effort.
async fn token_metadata(api: &ApiClient, req: &BurnRequest) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("mint".into(), json!(req.mint.to_string()));
    metadata.insert("amount".into(), json!(req.amount.to_display()));
    metadata.insert("decimals".into(), json!(req.amount.decimals()));
    metadata.insert("method".into(), json!(req.method.as_str()));

    match api.solana_tokens(&req.owner.to_string()).await {
        Ok(tokens) => {
            if let Some(token) = tokens.into_iter().find(|t| t.mint == req.mint.to_string()) {
                if let Some(symbol) = token.symbol {
                    metadata.insert("symbol".into(), json!(symbol));
                }
                if let Some(name) = token.name {
                    metadata.insert("name".into(), json!(name));
                }
                if !token.logo_uri.is_empty() {
                    metadata.insert("logoURI".into(), json!(token.logo_uri));
                }
            }
        }
        Err(e) => tracing::debug!(error = %e, "token metadata unavailable"),
    }
    metadata
}
