//! persona-analyzer - profile personality analysis service
//!
//! Fetches a public profile's recent posts, scores captions and images, and
//! serves Big Five trait estimates with a radar chart over HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use persona_analyzer::fetcher::{spawn_download_sweeper, InstagramClient};
use persona_analyzer::scoring::ScoringModels;
use persona_analyzer::{build_router, AppState, Analyzer};
use persona_common::config::{LoggingConfig, ServiceConfig};
use tokio::signal;
use tracing::info;

/// Command-line arguments for persona-analyzer
#[derive(Parser, Debug)]
#[command(name = "persona-analyzer")]
#[command(about = "Big Five personality analysis of public social profiles")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long, env = "PERSONA_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "PERSONA_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "PERSONA_BIND")]
    bind: Option<String>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Tracing first so configuration warnings are visible
    let bootstrap_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| LoggingConfig::default().level);
    let log_handle = persona_common::logging::init_tracing(&bootstrap_level)?;

    info!("Starting persona-analyzer");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let mut config = ServiceConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    match args.log_level {
        Some(level) => config.logging.level = level,
        None => log_handle.set_level(&config.logging.level)?,
    }

    tokio::fs::create_dir_all(&config.fetcher.download_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.fetcher.download_dir.display()))?;
    info!("Download directory: {}", config.fetcher.download_dir.display());
    let _sweeper = spawn_download_sweeper(
        config.fetcher.download_dir.clone(),
        config.fetcher.download_retention_days,
    );

    let models = ScoringModels::load(&config.models).context("Failed to load scoring models")?;
    info!(text = models.text.name(), image = models.image.name(), "Scoring models ready");

    let fetcher = InstagramClient::new(&config.fetcher).context("Failed to build profile fetcher")?;
    if config.fetcher.session_id.is_some() {
        info!("Using authenticated upstream session");
    }

    let analyzer = Analyzer::from_config(&config, Arc::new(fetcher), models)
        .context("Failed to configure analyzer")?;
    info!(
        cache = config.cache.enabled,
        ttl_secs = config.cache.ttl_secs,
        policy = ?config.analysis.zero_signal_policy,
        "Analyzer ready"
    );

    let state = AppState::new(Arc::new(analyzer), config.fetcher.download_dir.clone());
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.bind, config.server.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.server.bind, config.server.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, shutting down");
    }
}
