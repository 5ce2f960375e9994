//! `insight_raws` statements

use insightsim_common::db::Sample;
use insightsim_common::Result;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

/// Quality-based upsert keyed by `(tag, timestamp)`.
///
/// Inserts when the key is new. On conflict the stored row is overwritten only
/// when the incoming quality is greater than or equal to the stored one.
const UPSERT_SQL: &str = r#"
    INSERT INTO insight_raws (tag, timestamp, value, quality)
    VALUES (?, ?, ?, ?)
    ON CONFLICT(tag, timestamp) DO UPDATE SET
        value = excluded.value,
        quality = excluded.quality
    WHERE excluded.quality >= insight_raws.quality
"#;

/// Apply one sample through the merge rule
///
/// Returns `true` when a row was inserted or overwritten, `false` when the
/// stored sample kept precedence.
pub async fn upsert_sample<'e, E>(executor: E, sample: &Sample) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(UPSERT_SQL)
        .bind(&sample.tag)
        .bind(sample.timestamp_ms)
        .bind(sample.value)
        .bind(sample.quality)
        .execute(executor)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete every sample in the store
pub async fn delete_all_samples<'e, E>(executor: E) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM insight_raws").execute(executor).await?;
    Ok(result.rows_affected())
}

/// Delete every sample of one tag
pub async fn delete_samples_for_tag<'e, E>(executor: E, tag: &str) -> Result<u64>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM insight_raws WHERE tag = ?")
        .bind(tag)
        .execute(executor)
        .await?;
    Ok(result.rows_affected())
}

/// Count samples, optionally for a single tag
pub async fn count_samples<'e, E>(executor: E, tag: Option<&str>) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let count = match tag {
        Some(tag) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM insight_raws WHERE tag = ?")
                .bind(tag)
                .fetch_one(executor)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM insight_raws")
                .fetch_one(executor)
                .await?
        }
    };
    Ok(count)
}

/// Fetch a single sample by key
pub async fn get_sample<'e, E>(executor: E, tag: &str, timestamp_ms: i64) -> Result<Option<Sample>>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<(String, i64, f64, i64)> = sqlx::query_as(
        "SELECT tag, timestamp, value, quality FROM insight_raws WHERE tag = ? AND timestamp = ?",
    )
    .bind(tag)
    .bind(timestamp_ms)
    .fetch_optional(executor)
    .await?;

    Ok(row.map(|(tag, timestamp_ms, value, quality)| Sample {
        tag,
        timestamp_ms,
        value,
        quality,
    }))
}

/// Aggregated row: `(tag, bucket_start, SUM(value), MAX(quality))`
pub type BucketRow = (String, String, f64, i64);

fn push_range_filter<'a>(
    builder: &mut QueryBuilder<'a, Sqlite>,
    start_ms: i64,
    end_ms: i64,
    tags: Option<&[String]>,
) {
    builder
        .push(" WHERE timestamp >= ")
        .push_bind(start_ms)
        .push(" AND timestamp <= ")
        .push_bind(end_ms);

    if let Some(tags) = tags.filter(|t| !t.is_empty()) {
        builder.push(" AND tag IN (");
        let mut separated = builder.separated(", ");
        for tag in tags {
            separated.push_bind(tag.clone());
        }
        separated.push_unseparated(")");
    }
}

/// Raw samples in `[start_ms, end_ms]`, ordered by tag then timestamp
pub async fn fetch_range(
    pool: &SqlitePool,
    start_ms: i64,
    end_ms: i64,
    tags: Option<&[String]>,
) -> Result<Vec<Sample>> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT tag, timestamp, value, quality FROM insight_raws");
    push_range_filter(&mut builder, start_ms, end_ms, tags);
    builder.push(" ORDER BY tag, timestamp");

    let rows: Vec<(String, i64, f64, i64)> = builder.build_query_as().fetch_all(pool).await?;

    Ok(rows
        .into_iter()
        .map(|(tag, timestamp_ms, value, quality)| Sample {
            tag,
            timestamp_ms,
            value,
            quality,
        })
        .collect())
}

/// Calendar-bucket aggregation in `[start_ms, end_ms]`
///
/// `bucket_expr` is an SQL expression over the `timestamp` column yielding
/// the bucket start as `YYYY-MM-DDTHH:MM:SS` text, which also sorts
/// chronologically.
pub async fn fetch_buckets(
    pool: &SqlitePool,
    bucket_expr: &str,
    start_ms: i64,
    end_ms: i64,
    tags: Option<&[String]>,
) -> Result<Vec<BucketRow>> {
    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT tag, ");
    builder
        .push(bucket_expr)
        .push(" AS bucket, SUM(value), MAX(quality) FROM insight_raws");
    push_range_filter(&mut builder, start_ms, end_ms, tags);
    builder.push(" GROUP BY tag, bucket ORDER BY tag, bucket");

    let rows: Vec<BucketRow> = builder.build_query_as().fetch_all(pool).await?;
    Ok(rows)
}
