//! Folder-of-feed-files loader
//!
//! Every `*.json` file in the raw-data folder is one ingestion unit. Files are
//! processed in lexical name order; the first failing file stops the load and
//! earlier files stay committed.

use insightsim_common::db::TagSource;
use insightsim_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::services::merger::{self, FeedDocument};

/// Outcome of a folder load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    /// Rows inserted or overwritten
    pub records: u64,
    /// Feed files processed
    pub files: usize,
}

/// List `*.json` files (case-insensitive extension) sorted by file name
pub fn list_feed_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(Error::NotFound(format!(
            "raw data folder not found: {}",
            folder.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(folder)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            files.push(path);
        }
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Merge one feed file as a single unit
pub async fn load_file(pool: &SqlitePool, path: &Path) -> Result<u64> {
    let content = std::fs::read_to_string(path)?;
    let feed = FeedDocument::from_json(&content)?;
    merger::merge_unit(pool, &feed, TagSource::Load).await
}

/// Load every feed file in `folder`
pub async fn load_folder(pool: &SqlitePool, folder: &Path) -> Result<LoadSummary> {
    let files = list_feed_files(folder)?;
    if files.is_empty() {
        warn!("No feed files found in {}", folder.display());
    }

    let mut summary = LoadSummary::default();
    for path in &files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let records = load_file(pool, path)
            .await
            .map_err(|e| annotate_file_error(&name, e))?;

        info!(file = %name, records, "Loaded feed file");
        summary.records += records;
        summary.files += 1;
    }

    info!(
        "Loaded {} records from {} files in {}",
        summary.records,
        summary.files,
        folder.display()
    );
    Ok(summary)
}

/// Prefix the failing file name while keeping the error kind
fn annotate_file_error(file: &str, error: Error) -> Error {
    match error {
        Error::InvalidInput(msg) => Error::InvalidInput(format!("{}: {}", file, msg)),
        Error::NotFound(msg) => Error::NotFound(format!("{}: {}", file, msg)),
        Error::Io(e) => Error::Internal(format!("{}: {}", file, e)),
        Error::Database(e) => Error::Internal(format!("{}: database error: {}", file, e)),
        other => Error::Internal(format!("{}: {}", file, other)),
    }
}
