//! Router assembly and server lifecycle.

use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use devflation_chain::{JsonRpcClient, SolanaRpc};
use devflation_oracle::{HttpMarketSource, MarketSource, PriceOracle};
use devflation_store::{FileHistoryStore, HistoryStore};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::config::ApiConfig;
use crate::confirmer::{ConfirmationJob, ConfirmationQueue, ConfirmationWorker};
use crate::error::ServerError;
use crate::handlers::{self, method_not_allowed};
use crate::metrics::ApiMetrics;
use crate::shutdown::ShutdownController;
use crate::state::AppState;

/// Build the HTTP routes over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/tx/recent-blockhash",
            get(handlers::tx::recent_blockhash).fallback(method_not_allowed),
        )
        .route(
            "/api/tx/broadcast",
            post(handlers::tx::broadcast).fallback(method_not_allowed),
        )
        .route(
            "/api/tx/history",
            get(handlers::tx::history).fallback(method_not_allowed),
        )
        .route(
            "/api/solana-tokens",
            get(handlers::tokens::solana_tokens).fallback(method_not_allowed),
        )
        .route(
            "/api/solana-balance",
            get(handlers::tokens::solana_balance).fallback(method_not_allowed),
        )
        .route(
            "/api/price",
            get(handlers::price::price).fallback(method_not_allowed),
        )
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    if origins.is_empty() {
        return None;
    }
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);
    if origins.iter().any(|o| o == "*") {
        return Some(layer.allow_origin(Any));
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    Some(layer.allow_origin(allowed))
}

/// The API server with its confirmation worker.
pub struct ApiServer {
    config: ApiConfig,
    state: AppState,
    worker: ConfirmationWorker,
    jobs: mpsc::UnboundedReceiver<ConfirmationJob>,
}

impl ApiServer {
    /// Wire the production components described by `config`.
    pub async fn from_config(config: ApiConfig) -> Result<Self, ServerError> {
        let chain = Arc::new(JsonRpcClient::new(&config.solana_rpc_url)?);
        let store = Arc::new(FileHistoryStore::open(&config.data_dir).await?);
        let source = Arc::new(HttpMarketSource::new(config.oracle.clone())?);
        Ok(Self::with_components(config, chain, store, source))
    }

    /// Wire explicit components; tests pass nullables here.
    pub fn with_components(
        config: ApiConfig,
        chain: Arc<dyn SolanaRpc>,
        store: Arc<dyn HistoryStore>,
        source: Arc<dyn MarketSource>,
    ) -> Self {
        let metrics = config.enable_metrics.then(|| Arc::new(ApiMetrics::new()));
        let (queue, jobs) = ConfirmationQueue::channel();

        let mut worker = ConfirmationWorker::new(
            chain.clone(),
            store.clone(),
            config.confirm_poll_interval(),
            config.confirm_timeout(),
        );
        if let Some(m) = &metrics {
            worker = worker.with_metrics(m.clone());
        }

        let state = AppState {
            chain,
            store,
            oracle: Arc::new(PriceOracle::new(source, config.price_cache_ttl())),
            confirmations: queue,
            metrics,
        };
        Self {
            config,
            state,
            worker,
            jobs,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn router(&self) -> Router {
        let app = router(self.state.clone());
        match cors_layer(&self.config.cors_origins) {
            Some(cors) => app.layer(cors),
            None => app,
        }
    }

    /// Bind `config.listen_addr` and serve until shutdown.
    pub async fn start(self, shutdown: &ShutdownController) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.config.listen_addr).await?;
        self.run(listener, shutdown).await
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn run(self, listener: TcpListener, shutdown: &ShutdownController) -> Result<(), ServerError> {
        let app = self.router();
        let Self {
            state, worker, jobs, ..
        } = self;

        if let Err(e) = worker.resume_pending(&state.confirmations).await {
            warn!(error = %e, "could not scan history for pending burns");
        }
        tokio::spawn(worker.run(jobs, shutdown.subscribe()));

        info!(addr = %listener.local_addr()?, "API server listening");
        let mut stop = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { stop.requested().await })
            .await?;
        info!("API server stopped");
        Ok(())
    }
}
