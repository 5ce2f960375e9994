//! Synthetic generation endpoint
//!
//! `POST /api/generate-dummy` validates the request and resolves tags before
//! answering; failures there are ordinary HTTP errors. Once the run starts the
//! response streams one JSON object per line (NDJSON) until the terminal
//! `done` or `error` record.

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use std::convert::Infallible;
use tracing::{debug, info};

use crate::error::ApiResult;
use crate::services::generator::{self, GenerationRequest};
use crate::AppState;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// POST /api/generate-dummy
pub async fn generate_dummy(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let plan = generator::prepare(&state.db, &state.config.data, request).await?;

    info!(
        tags = plan.tags.len(),
        ticks_per_tag = plan.ticks_per_tag(),
        seed = plan.seed,
        "Generation accepted"
    );

    let mut rx = generator::spawn(state.db.clone(), plan);

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            debug!("Streaming generation event: {}", event.event_type());
            let terminal = event.is_terminal();
            yield Ok::<_, Infallible>(event.to_ndjson_line());
            if terminal {
                break;
            }
        }
    };

    Ok((
        [
            (header::CONTENT_TYPE, NDJSON_CONTENT_TYPE),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

pub fn generate_routes() -> Router<AppState> {
    Router::new().route("/api/generate-dummy", post(generate_dummy))
}
