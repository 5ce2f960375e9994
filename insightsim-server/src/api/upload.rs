//! CSV upload endpoint
//!
//! Multipart form with a `file` part (the CSV) and a `mode` part
//! (`override` or `replace`).

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::services::csv_import::{self, ImportMode};
use crate::AppState;

/// Maximum accepted upload size
pub const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub count: u64,
    pub tags_affected: usize,
}

/// POST /api/upload-csv
pub async fn upload_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut mode_text = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {}", e)))?
    {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let name = field.file_name().unwrap_or("upload.csv").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("missing or invalid file: {}", e)))?;
                file = Some((name, bytes.to_vec()));
            }
            "mode" => {
                mode_text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("invalid mode field: {}", e)))?;
            }
            _ => {}
        }
    }

    let (file_name, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("missing or invalid file".to_string()))?;
    let mode = mode_text.parse::<ImportMode>()?;

    let summary = csv_import::import_csv(&state.db, bytes.as_slice(), mode).await?;
    info!(
        file = %file_name,
        mode = ?mode,
        count = summary.count,
        tags = summary.tags_affected,
        "CSV upload imported"
    );

    Ok(Json(UploadResponse {
        success: true,
        message: "CSV imported successfully".to_string(),
        count: summary.count,
        tags_affected: summary.tags_affected,
    }))
}

pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/api/upload-csv", post(upload_csv))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}
