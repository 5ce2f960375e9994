//! Query / aggregation engine
//!
//! Read-only. Raw queries return samples in the range grouped by tag;
//! aggregated queries fold them into UTC calendar buckets with
//! `value = SUM` and `quality = MAX`.

use insightsim_common::db::DataPoint;
use insightsim_common::{time, Error, Result};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::str::FromStr;
use tracing::debug;

use crate::db::samples;

/// Query result: tag → points ordered by timestamp (tags ordered by name)
pub type QueryResult = BTreeMap<String, Vec<DataPoint>>;

/// Whole epoch seconds, floored so pre-1970 millis stay in their own second
const UNIX_SECONDS: &str = "timestamp / 1000 - (timestamp % 1000 < 0), 'unixepoch'";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Granularity {
    #[default]
    Raw,
    Daily,
    Monthly,
    Quarterly,
    Yearly,
}

impl Granularity {
    /// SQL expression yielding the bucket start text, `None` for raw
    fn bucket_start_sql(&self) -> Option<String> {
        let expr = match self {
            Granularity::Raw => return None,
            Granularity::Daily => format!("strftime('%Y-%m-%dT00:00:00', {})", UNIX_SECONDS),
            Granularity::Monthly => format!("strftime('%Y-%m-01T00:00:00', {})", UNIX_SECONDS),
            Granularity::Yearly => format!("strftime('%Y-01-01T00:00:00', {})", UNIX_SECONDS),
            // First month of the quarter: ((m - 1) / 3) * 3 + 1
            Granularity::Quarterly => format!(
                "strftime('%Y', {u}) || '-' || \
                 printf('%02d', ((CAST(strftime('%m', {u}) AS INTEGER) - 1) / 3) * 3 + 1) || \
                 '-01T00:00:00'",
                u = UNIX_SECONDS
            ),
        };
        Some(expr)
    }
}

impl FromStr for Granularity {
    type Err = Error;

    /// Case-insensitive; empty text means raw
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "raw" => Ok(Granularity::Raw),
            "daily" => Ok(Granularity::Daily),
            "monthly" => Ok(Granularity::Monthly),
            "quarterly" => Ok(Granularity::Quarterly),
            "yearly" => Ok(Granularity::Yearly),
            _ => Err(Error::InvalidInput(format!(
                "invalid aggregate '{}' (expected raw, daily, monthly, quarterly or yearly)",
                s
            ))),
        }
    }
}

/// Split a comma-separated tag filter; empty input means no filter
pub fn parse_tag_filter(text: Option<&str>) -> Option<Vec<String>> {
    let tags: Vec<String> = text?
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect();
    if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Query samples in `[start, end]`
///
/// `start` and `end` are parsed before any storage access; `start > end` is
/// rejected.
pub async fn query(
    pool: &SqlitePool,
    start: &str,
    end: &str,
    tags: Option<&[String]>,
    granularity: Granularity,
) -> Result<QueryResult> {
    let start_ms = time::parse_timestamp(start)?;
    let end_ms = time::parse_timestamp(end)?;
    if start_ms > end_ms {
        return Err(Error::InvalidInput(format!(
            "start ({}) must not be after end ({})",
            start, end
        )));
    }

    let mut result = QueryResult::new();

    match granularity.bucket_start_sql() {
        None => {
            for sample in samples::fetch_range(pool, start_ms, end_ms, tags).await? {
                result.entry(sample.tag).or_default().push(DataPoint {
                    timestamp: time::format_timestamp(sample.timestamp_ms),
                    value: sample.value,
                    quality: sample.quality,
                });
            }
        }
        Some(expr) => {
            let rows = samples::fetch_buckets(pool, &expr, start_ms, end_ms, tags).await?;
            for (tag, bucket_start, sum, max_quality) in rows {
                result.entry(tag).or_default().push(DataPoint {
                    timestamp: bucket_start,
                    value: sum,
                    quality: max_quality,
                });
            }
        }
    }

    debug!(
        granularity = ?granularity,
        tags = result.len(),
        points = result.values().map(Vec::len).sum::<usize>(),
        "Query complete"
    );
    Ok(result)
}
