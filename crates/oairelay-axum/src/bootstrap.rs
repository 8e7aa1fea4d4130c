//! Composition root for the Axum server.
//!
//! Builds the upstream client, the audit log sinks and the relay service from
//! [`RelaySettings`], then serves the router until cancelled.

use std::sync::Arc;

use anyhow::{Context, Result};
use oairelay_core::{
    FanoutLog, InteractionLog, JsonlAuditLog, RelayService, RelaySettings, TracingLog,
};
use oairelay_openai::{OpenAiClient, OpenAiConfig};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::routes::create_router;

/// File name of the JSON-lines audit log inside `log_dir`.
pub const AUDIT_LOG_FILE: &str = "interactions.jsonl";

/// CORS configuration for the HTTP server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CorsConfig {
    /// Allow all origins (development mode).
    #[default]
    AllowAll,
    /// Allow specific origins (production mode).
    AllowOrigins(Vec<String>),
}

impl CorsConfig {
    /// An empty origin list allows everything.
    #[must_use]
    pub fn from_origins(origins: &[String]) -> Self {
        if origins.is_empty() {
            Self::AllowAll
        } else {
            Self::AllowOrigins(origins.to_vec())
        }
    }
}

/// Services shared by every handler.
#[derive(Debug, Clone)]
pub struct ProxyContext {
    pub relay: RelayService,
}

impl ProxyContext {
    pub const fn new(relay: RelayService) -> Self {
        Self { relay }
    }
}

/// Wire all services from settings.
pub async fn bootstrap(settings: &RelaySettings) -> Result<ProxyContext> {
    settings.validate().context("Invalid proxy settings")?;

    let config = OpenAiConfig::from_settings(settings)?;
    if config.api_key.is_none() {
        warn!("OPENAI_API_KEY is not set; upstream requests will be unauthenticated");
    }
    let client = OpenAiClient::new(config)?;
    let log = build_audit_log(settings).await?;

    info!(
        target: "oairelay.bootstrap",
        upstream = %settings.upstream_base_url,
        max_attempts = settings.retry.max_attempts,
        base_delay_ms = settings.retry.base_delay_ms,
        max_delay_ms = settings.retry.max_delay_ms,
        audit_dir = ?settings.log_dir,
        "Proxy bootstrap complete"
    );

    Ok(ProxyContext::new(RelayService::new(
        Arc::new(client),
        settings.retry,
        log,
    )))
}

/// Tracing audit events always; a JSON-lines file when `log_dir` is set.
async fn build_audit_log(settings: &RelaySettings) -> Result<Arc<dyn InteractionLog>> {
    let mut fanout = FanoutLog::default().with(Arc::new(TracingLog));
    if let Some(ref dir) = settings.log_dir {
        let path = dir.join(AUDIT_LOG_FILE);
        let jsonl = JsonlAuditLog::open(&path)
            .await
            .with_context(|| format!("Failed to open audit log {}", path.display()))?;
        fanout = fanout.with(Arc::new(jsonl));
    }
    Ok(Arc::new(fanout))
}

/// Serve `ctx` on a pre-bound listener until `cancel` fires.
pub async fn serve(
    listener: TcpListener,
    ctx: ProxyContext,
    cors: &CorsConfig,
    cancel: CancellationToken,
) -> Result<()> {
    let addr = listener.local_addr()?;
    let app = create_router(ctx, cors);

    info!("oairelay listening on http://{addr}");
    info!("Point OpenAI clients at: http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("oairelay shut down");
    Ok(())
}

/// Resolve the configured host (name or literal) and bind the first address
/// that accepts.
pub async fn bind_listener(settings: &RelaySettings) -> Result<TcpListener> {
    let (host, port) = settings.bind_target();
    TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))
}

/// Bootstrap, bind and serve.
pub async fn start_server(settings: RelaySettings, cancel: CancellationToken) -> Result<()> {
    let ctx = bootstrap(&settings).await?;
    let listener = bind_listener(&settings).await?;
    serve(
        listener,
        ctx,
        &CorsConfig::from_origins(&settings.cors_origins),
        cancel,
    )
    .await
}
