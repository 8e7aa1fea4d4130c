//! CLI entry point - the composition root.

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use oairelay_cli::{Cli, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads the environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    let settings = cli.into_settings();
    let _guard = init_tracing(verbose, settings.log_dir.as_deref())?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {e}");
            return;
        }
        info!("Shutdown requested");
        shutdown.cancel();
    });

    oairelay_axum::start_server(settings, cancel).await
}
