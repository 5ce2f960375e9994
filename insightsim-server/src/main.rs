//! insightsim - tagged time-series simulator service
//!
//! Loads configuration, opens (or creates) the SQLite store, optionally seeds
//! the tag registry from the legacy tag-list file, then serves the HTTP API.

use anyhow::{Context, Result};
use clap::Parser;
use insightsim_common::config::{resolve_config_path, AppConfig};
use insightsim_common::db::init::init_database;
use insightsim_server::services::tag_registry;
use insightsim_server::{build_router, AppState};
use std::path::PathBuf;
use tracing::{info, warn};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "insightsim")]
#[command(about = "Tagged time-series ingestion, generation and query service")]
#[command(version)]
struct Args {
    /// Configuration file (falls back to INSIGHTSIM_CONFIG, then ./insightsim.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides [database].path)
    #[arg(long, env = "INSIGHTSIM_DB")]
    db: Option<PathBuf>,

    /// Bind host (overrides [server].host)
    #[arg(long, env = "INSIGHTSIM_HOST")]
    host: Option<String>,

    /// Bind port (overrides [server].port)
    #[arg(short, long, env = "INSIGHTSIM_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting InsightSim v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    info!("Configuration file: {}", config_path.display());
    let mut config = AppConfig::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))?;

    if let Some(db) = args.db {
        config.database.path = db;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("Database path: {}", config.database.path.display());
    let pool = init_database(&config.database.path)
        .await
        .context("Failed to initialize database")?;
    info!("✓ Database ready");

    if let Some(tag_list) = &config.data.tag_list_file {
        if tag_list.exists() {
            tag_registry::seed_from_tag_list(&pool, tag_list)
                .await
                .with_context(|| format!("Failed to seed tags from {}", tag_list.display()))?;
        } else {
            warn!("Tag list file not found: {} (skipping seed)", tag_list.display());
        }
    }

    let addr = config.server_addr();
    let state = AppState::new(pool, config);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("insightsim listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
