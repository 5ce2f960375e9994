//! Feed ingestion endpoints
//!
//! - `POST /api/load`: every feed file in the configured raw-data folder
//! - `POST /api/ingest`: one feed document in the request body

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use insightsim_common::db::TagSource;
use serde::Serialize;
use tracing::info;

use crate::error::ApiResult;
use crate::services::feed_loader;
use crate::services::merger::{self, FeedDocument};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub success: bool,
    pub message: String,
    pub count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_count: Option<usize>,
}

/// POST /api/load
pub async fn load_feed_folder(State(state): State<AppState>) -> ApiResult<Json<IngestResponse>> {
    let folder = &state.config.data.raw_data_folder;
    info!("Loading feed files from {}", folder.display());

    let summary = feed_loader::load_folder(&state.db, folder).await?;

    Ok(Json(IngestResponse {
        success: true,
        message: format!(
            "Loaded {} records from {} files",
            summary.records, summary.files
        ),
        count: summary.records,
        files_count: Some(summary.files),
    }))
}

/// POST /api/ingest
pub async fn ingest_feed(
    State(state): State<AppState>,
    payload: Result<Json<FeedDocument>, JsonRejection>,
) -> ApiResult<Json<IngestResponse>> {
    let Json(feed) = payload?;
    let points = feed.point_count();
    let count = merger::merge_unit(&state.db, &feed, TagSource::Load).await?;
    info!(tags = feed.result.len(), points, applied = count, "Ingested feed document");

    Ok(Json(IngestResponse {
        success: true,
        message: format!("Merged {} of {} points", count, points),
        count,
        files_count: None,
    }))
}

pub fn ingest_routes() -> Router<AppState> {
    Router::new()
        .route("/api/load", post(load_feed_folder))
        .route("/api/ingest", post(ingest_feed))
}
