//! Time-series query endpoints
//!
//! - `GET /api/timeseriesdata/:start/:end?tags=a,b&aggregate=daily`
//! - `GET /api/timeseriesdata?start=..&end=..&tags=..&aggregate=..`

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::services::query::{self, Granularity, QueryResult};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct QueryParams {
    pub start: Option<String>,
    pub end: Option<String>,
    pub tags: Option<String>,
    pub aggregate: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub result: QueryResult,
}

async fn run_query(
    state: &AppState,
    start: &str,
    end: &str,
    params: &QueryParams,
) -> ApiResult<Json<QueryResponse>> {
    let granularity = params
        .aggregate
        .as_deref()
        .unwrap_or("")
        .parse::<Granularity>()?;
    let tags = query::parse_tag_filter(params.tags.as_deref());

    let result = query::query(&state.db, start, end, tags.as_deref(), granularity).await?;
    Ok(Json(QueryResponse { result }))
}

/// GET /api/timeseriesdata/:start/:end
pub async fn query_by_path(
    State(state): State<AppState>,
    Path((start, end)): Path<(String, String)>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<QueryResponse>> {
    run_query(&state, &start, &end, &params).await
}

/// GET /api/timeseriesdata
pub async fn query_by_params(
    State(state): State<AppState>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<QueryResponse>> {
    let start = params
        .start
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("missing query param: start".to_string()))?;
    let end = params
        .end
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("missing query param: end".to_string()))?;
    run_query(&state, start, end, &params).await
}

pub fn query_routes() -> Router<AppState> {
    Router::new()
        .route("/api/timeseriesdata", get(query_by_params))
        .route("/api/timeseriesdata/:start/:end", get(query_by_path))
}
