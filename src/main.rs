//! Quality Desk - data-quality dashboard backend
//!
//! Serves synthetic exceptions, events, rules and source comparisons over
//! JSON for the dashboard client.

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quality_desk_backend::{build_router, AppState, ServerConfig};

const DEFAULT_LOG_FILTER: &str = "quality_desk_backend=debug,tower_http=debug";

#[derive(Parser, Debug)]
#[command(name = "quality-desk")]
#[command(about = "Data-quality dashboard backend serving in-memory mock data")]
struct Args {
    /// TOML config file
    #[arg(long, env = "QUALITY_DESK_CONFIG")]
    config: Option<PathBuf>,

    /// Listen port (overrides config and PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Mock data seed (overrides config and MOCK_SEED)
    #[arg(long)]
    seed: Option<u64>,

    /// Log filter, e.g. "info" or "quality_desk_backend=trace"
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env();
    let args = Args::parse();
    init_tracing(args.log_level.as_deref());

    let config = resolve_config(&args)?;
    let addr = config.socket_addr()?;
    info!(
        seed = ?config.seed,
        exceptions = config.exception_count,
        events = config.event_count,
        comparisons = config.comparison_count,
        "Quality Desk starting"
    );

    let app = build_router(AppState::new(config));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("API server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

/// Defaults, then the TOML file, then environment, then CLI flags.
fn resolve_config(args: &Args) -> Result<ServerConfig> {
    let base = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    let mut config = base.with_env_overrides();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    Ok(config)
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => tracing_subscriber::EnvFilter::new(level),
        None => tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn load_env() {
    let _ = dotenv();

    // Also pick up a .env next to the manifest when launched from elsewhere.
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(err) => {
            // Without a signal handler keep serving until the process is killed.
            warn!(error = %err, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    }
}
