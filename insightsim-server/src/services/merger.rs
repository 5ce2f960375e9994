//! Ingestion merger
//!
//! Quality-based upsert of externally supplied samples. One ingestion unit
//! (a feed file, an ingest request body, a CSV file) is applied inside one
//! transaction: any parse or storage error rolls the whole unit back.

use insightsim_common::db::{Sample, TagSource};
use insightsim_common::{time, Error, Result};
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::samples;
use crate::services::tag_registry;

/// One externally supplied point; the timestamp is still text
#[derive(Debug, Clone, Deserialize)]
pub struct FeedPoint {
    pub timestamp: String,
    pub value: f64,
    #[serde(default)]
    pub quality: i64,
}

/// Feed document: `{"result": {tag: [{timestamp, value, quality}]}}`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeedDocument {
    pub result: BTreeMap<String, Vec<FeedPoint>>,
}

impl FeedDocument {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidInput(format!("invalid feed document: {}", e)))
    }

    /// Total number of points across all tags
    pub fn point_count(&self) -> usize {
        self.result.values().map(Vec::len).sum()
    }
}

/// Apply already-parsed samples through the merge rule on an open connection
///
/// Returns the number of rows inserted or overwritten.
pub async fn merge_samples(conn: &mut SqliteConnection, batch: &[Sample]) -> Result<u64> {
    let mut applied = 0;
    for sample in batch {
        if samples::upsert_sample(&mut *conn, sample).await? {
            applied += 1;
        }
    }
    Ok(applied)
}

/// Parse and merge the points of one tag on an open connection
///
/// A malformed timestamp fails with an error naming the literal and the tag;
/// the caller's transaction is expected to roll back.
pub async fn merge_batch(conn: &mut SqliteConnection, tag: &str, points: &[FeedPoint]) -> Result<u64> {
    let mut applied = 0;
    for point in points {
        let timestamp_ms = time::parse_timestamp(&point.timestamp).map_err(|_| {
            Error::InvalidInput(format!(
                "invalid timestamp '{}' for tag '{}'",
                point.timestamp, tag
            ))
        })?;

        let sample = Sample::new(tag, timestamp_ms, point.value, point.quality);
        if samples::upsert_sample(&mut *conn, &sample).await? {
            applied += 1;
        }
    }
    Ok(applied)
}

/// Merge one ingestion unit atomically
///
/// Every tag in the document is registered with `source` when absent, inside
/// the same transaction as its samples.
pub async fn merge_unit(pool: &SqlitePool, feed: &FeedDocument, source: TagSource) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut applied = 0;

    for (tag, points) in &feed.result {
        tag_registry::register_if_absent(&mut *tx, tag, source).await?;
        let tag_applied = merge_batch(&mut tx, tag, points).await?;
        if !points.is_empty() {
            tag_registry::touch(&mut *tx, tag).await?;
        }
        debug!(tag = %tag, points = points.len(), applied = tag_applied, "Merged tag");
        applied += tag_applied;
    }

    tx.commit().await?;
    Ok(applied)
}
