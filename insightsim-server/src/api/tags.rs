//! Tag registry endpoints

use axum::{
    extract::{rejection::JsonRejection, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use insightsim_common::db::TagRecord;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ApiError, ApiResult};
use crate::pagination::{Pagination, MAX_PAGE_SIZE};
use crate::services::tag_registry::{self, TagPage};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub tag: String,
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteParams {
    pub tag: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagNamesResponse {
    pub tags: Vec<String>,
}

/// GET /api/tags?page=&limit=&q=
pub async fn list_tags(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<TagPage>> {
    let pagination = Pagination::capped(
        params.page.unwrap_or(1),
        params.limit.unwrap_or(0),
        MAX_PAGE_SIZE,
    );
    let page = tag_registry::list_page(&state.db, pagination, params.q.as_deref()).await?;
    Ok(Json(page))
}

/// GET /api/tags/names
pub async fn list_tag_names(State(state): State<AppState>) -> ApiResult<Json<TagNamesResponse>> {
    let tags = tag_registry::list_all_names(&state.db).await?;
    Ok(Json(TagNamesResponse { tags }))
}

/// POST /api/tags
pub async fn create_tag(
    State(state): State<AppState>,
    payload: Result<Json<CreateTagRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TagRecord>)> {
    let Json(request) = payload?;
    let record = tag_registry::create(&state.db, &request.tag, request.source.as_deref()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// DELETE /api/tags?tag=
pub async fn delete_tag(
    State(state): State<AppState>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<Json<Value>> {
    let tag = params
        .tag
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing query param: tag".to_string()))?;

    let removed = tag_registry::delete(&state.db, tag).await?;
    Ok(Json(json!({
        "success": true,
        "tag": tag,
        "samples_deleted": removed,
    })))
}

pub fn tag_routes() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(list_tags).post(create_tag).delete(delete_tag))
        .route("/api/tags/names", get(list_tag_names))
}
