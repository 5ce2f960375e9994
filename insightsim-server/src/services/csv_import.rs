//! Wide CSV import
//!
//! Format: header `timestamp,<tag1>,<tag2>,...`, then one row per timestamp.
//! The whole file is one ingestion unit applied through the merge rule with
//! the fixed import quality.

use insightsim_common::db::{Sample, TagSource, GOOD_QUALITY};
use insightsim_common::{time, Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::io::Read;
use std::str::FromStr;
use tracing::info;

use crate::db::samples;
use crate::services::{merger, tag_registry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportMode {
    /// Merge into existing data
    Override,
    /// Delete every existing sample of the header tags first
    Replace,
}

impl FromStr for ImportMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "override" => Ok(ImportMode::Override),
            "replace" => Ok(ImportMode::Replace),
            "" => Err(Error::InvalidInput(
                "missing mode (required: override or replace)".to_string(),
            )),
            _ => Err(Error::InvalidInput(
                "invalid mode (must be override or replace)".to_string(),
            )),
        }
    }
}

/// Decoded CSV content
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCsv {
    /// Header tags in column order
    pub tags: Vec<String>,
    pub samples: Vec<Sample>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// Rows inserted or overwritten
    pub count: u64,
    /// Number of header tags
    pub tags_affected: usize,
}

fn csv_error(e: csv::Error) -> Error {
    Error::InvalidInput(format!("failed to read CSV: {}", e))
}

/// Parse a wide CSV document into samples
///
/// Row numbers in errors are 1-based with the header on row 1.
pub fn parse_csv<R: Read>(reader: R) -> Result<ParsedCsv> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();

    let header = match records.next() {
        Some(record) => record.map_err(csv_error)?,
        None => return Err(Error::InvalidInput("CSV is empty".to_string())),
    };
    if header.len() < 2 {
        return Err(Error::InvalidInput(
            "CSV must have timestamp column and at least one tag column".to_string(),
        ));
    }
    let first = header.get(0).unwrap_or("");
    if !first.trim().eq_ignore_ascii_case("timestamp") {
        return Err(Error::InvalidInput(format!(
            "first column must be 'timestamp', got '{}'",
            first
        )));
    }

    let mut tags = Vec::with_capacity(header.len() - 1);
    for (i, cell) in header.iter().enumerate().skip(1) {
        let tag = cell.trim();
        if tag.is_empty() {
            return Err(Error::InvalidInput(format!("empty tag name in column {}", i + 1)));
        }
        tags.push(tag.to_string());
    }

    let mut parsed = ParsedCsv {
        tags,
        samples: Vec::new(),
    };

    for (index, record) in records.enumerate() {
        let record = record.map_err(csv_error)?;
        let row = record
            .position()
            .map(|p| p.line())
            .unwrap_or(index as u64 + 2);

        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if record.len() != header.len() {
            return Err(Error::InvalidInput(format!(
                "row {}: expected {} columns, got {}",
                row,
                header.len(),
                record.len()
            )));
        }

        let ts_text = record.get(0).unwrap_or("").trim();
        if ts_text.is_empty() {
            return Err(Error::InvalidInput(format!("row {}: empty timestamp", row)));
        }
        let timestamp_ms = time::parse_timestamp(ts_text)
            .map_err(|e| Error::InvalidInput(format!("row {}: {}", row, e)))?;

        for (tag, cell) in parsed.tags.iter().zip(record.iter().skip(1)) {
            let cell = cell.trim();
            let value = if cell.is_empty() {
                0.0
            } else {
                cell.parse::<f64>().map_err(|_| {
                    Error::InvalidInput(format!(
                        "row {} column {}: invalid number '{}'",
                        row, tag, cell
                    ))
                })?
            };
            parsed
                .samples
                .push(Sample::new(tag.as_str(), timestamp_ms, value, GOOD_QUALITY));
        }
    }

    Ok(parsed)
}

/// Import a CSV document as one ingestion unit
pub async fn import_csv<R: Read>(pool: &SqlitePool, reader: R, mode: ImportMode) -> Result<ImportSummary> {
    let parsed = parse_csv(reader)?;

    let mut tx = pool.begin().await?;

    if mode == ImportMode::Replace {
        for tag in &parsed.tags {
            samples::delete_samples_for_tag(&mut *tx, tag).await?;
        }
    }

    let count = merger::merge_samples(&mut tx, &parsed.samples).await?;

    for tag in &parsed.tags {
        tag_registry::register_if_absent(&mut *tx, tag, TagSource::Upload).await?;
        tag_registry::touch(&mut *tx, tag).await?;
    }

    tx.commit().await?;

    info!(
        mode = ?mode,
        tags = parsed.tags.len(),
        "Imported CSV: {} records",
        count
    );

    Ok(ImportSummary {
        count,
        tags_affected: parsed.tags.len(),
    })
}
