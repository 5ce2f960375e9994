//! Client-facing configuration defaults

use axum::{extract::State, routing::get, Json, Router};
use insightsim_common::config::ValueRange;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub value_range: ValueRange,
    pub use_sequential_generation: bool,
    pub generation_start_time: String,
    pub generation_end_time: String,
}

/// GET /api/config
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let data = &state.config.data;
    Json(ConfigResponse {
        value_range: data.value_range,
        use_sequential_generation: data.use_sequential_generation,
        generation_start_time: data.generation_start_time.clone(),
        generation_end_time: data.generation_end_time.clone(),
    })
}

pub fn config_routes() -> Router<AppState> {
    Router::new().route("/api/config", get(get_config))
}
