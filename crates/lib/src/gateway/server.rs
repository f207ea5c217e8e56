//! Gateway HTTP server: LINE webhook callback and health probe.

use crate::channels::{self, InboundMessage, ParseError};
use crate::config::ResolvedConfig;
use crate::records::{NotionRecords, RecordStore};
use anyhow::{Context, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

/// Shared state for the gateway. Immutable after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub config: Arc<ResolvedConfig>,
    /// Where inbound text messages are saved.
    pub store: Arc<dyn RecordStore>,
}

impl GatewayState {
    pub fn new(config: ResolvedConfig, store: Arc<dyn RecordStore>) -> Self {
        Self {
            config: Arc::new(config),
            store,
        }
    }
}

/// Routes: `GET /` health and `POST /callback` LINE webhook.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/", get(health_http))
        .route("/callback", post(callback))
        .with_state(state)
}

/// Run the gateway with the Notion record store; binds to config.bind:config.port.
/// Blocks until shutdown (e.g. Ctrl+C).
pub async fn run_gateway(config: ResolvedConfig) -> Result<()> {
    let store: Arc<dyn RecordStore> = Arc::new(NotionRecords::from_settings(&config.notion));
    log::info!(
        "forwarding text messages to notion database {}",
        config.notion.database_id
    );
    run_gateway_with_store(config, store).await
}

/// Run the gateway with any record store.
pub async fn run_gateway_with_store(
    config: ResolvedConfig,
    store: Arc<dyn RecordStore>,
) -> Result<()> {
    let bind_addr = format!("{}:{}", config.bind, config.port);
    let app = router(GatewayState::new(config, store));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding to {}", bind_addr))?;
    log::info!("server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("gateway server exited")?;
    log::info!("gateway stopped");
    Ok(())
}

/// Future that completes when the process should shut down (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                log::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutdown signal received, draining connections");
}

/// POST /callback: verifies X-Line-Signature, then saves each text message in order.
/// The status depends only on verification and parsing, never on save results.
async fn callback(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get(channels::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let webhook = match channels::parse_request(&state.config.channel_secret, signature, &body) {
        Ok(w) => w,
        Err(ParseError::InvalidSignature) => {
            log::warn!("callback rejected: invalid signature");
            return StatusCode::BAD_REQUEST;
        }
        Err(e) => {
            log::error!("callback rejected: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR;
        }
    };
    forward_messages(state.store.as_ref(), webhook.text_messages()).await;
    StatusCode::OK
}

/// Save each message once, in order. A failed save is logged and the rest still run.
/// Returns how many saves succeeded.
pub async fn forward_messages(store: &dyn RecordStore, messages: Vec<InboundMessage>) -> usize {
    let mut saved = 0;
    for msg in messages {
        match store.save_text(&msg.text).await {
            Ok(()) => {
                saved += 1;
                log::info!("message saved to notion database: {}", msg.text);
            }
            Err(e) => log::warn!("error saving to notion database: {}", e),
        }
    }
    saved
}

/// GET / returns a simple health JSON (for probes).
async fn health_http(State(state): State<GatewayState>) -> Json<serde_json::Value> {
    Json(json!({
        "runtime": "running",
        "port": state.config.port,
    }))
}
