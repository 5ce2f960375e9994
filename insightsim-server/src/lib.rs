//! insightsim-server library
//!
//! Ingestion, synthetic generation and time-bucketed queries over tagged
//! time-series samples stored in SQLite, exposed over HTTP.

use axum::Router;
use chrono::{DateTime, Utc};
use insightsim_common::config::AppConfig;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod pagination;
pub mod services;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Resolved configuration
    pub config: Arc<AppConfig>,
    /// Service startup timestamp (for uptime calculation)
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, config: AppConfig) -> Self {
        Self {
            db,
            config: Arc::new(config),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::http::Method;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .merge(api::health_routes())
        .merge(api::config_routes())
        .merge(api::ingest_routes())
        .merge(api::generate_routes())
        .merge(api::upload_routes())
        .merge(api::query_routes())
        .merge(api::tag_routes())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
