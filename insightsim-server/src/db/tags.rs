//! `tags` registry statements

use insightsim_common::db::{TagRecord, TagSource};
use insightsim_common::Result;
use sqlx::SqliteExecutor;

/// Insert a new registry row; fails with a unique violation when the tag exists
pub async fn insert_tag<'e, E>(executor: E, tag: &str, source: TagSource, now: &str) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query("INSERT INTO tags (tag, created_at, updated_at, source) VALUES (?, ?, ?, ?)")
        .bind(tag)
        .bind(now)
        .bind(now)
        .bind(source.as_str())
        .execute(executor)
        .await?;
    Ok(())
}

/// Insert a registry row unless the tag already exists (existing `source` is kept)
///
/// Returns `true` when a new row was created.
pub async fn insert_tag_if_absent<'e, E>(
    executor: E,
    tag: &str,
    source: TagSource,
    now: &str,
) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query(
        "INSERT OR IGNORE INTO tags (tag, created_at, updated_at, source) VALUES (?, ?, ?, ?)",
    )
    .bind(tag)
    .bind(now)
    .bind(now)
    .bind(source.as_str())
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn touch_tag<'e, E>(executor: E, tag: &str, now: &str) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("UPDATE tags SET updated_at = ? WHERE tag = ?")
        .bind(now)
        .bind(tag)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn delete_tag_row<'e, E>(executor: E, tag: &str) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM tags WHERE tag = ?")
        .bind(tag)
        .execute(executor)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn tag_exists<'e, E>(executor: E, tag: &str) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM tags WHERE tag = ?)")
        .bind(tag)
        .fetch_one(executor)
        .await?;
    Ok(exists)
}

pub async fn get_tag<'e, E>(executor: E, tag: &str) -> Result<Option<TagRecord>>
where
    E: SqliteExecutor<'e>,
{
    let record = sqlx::query_as::<_, TagRecord>(
        "SELECT tag, created_at, updated_at, source FROM tags WHERE tag = ?",
    )
    .bind(tag)
    .fetch_optional(executor)
    .await?;
    Ok(record)
}

/// Every registered tag name, ordered
pub async fn list_tag_names<'e, E>(executor: E) -> Result<Vec<String>>
where
    E: SqliteExecutor<'e>,
{
    let names = sqlx::query_scalar("SELECT tag FROM tags ORDER BY tag")
        .fetch_all(executor)
        .await?;
    Ok(names)
}

/// Count registry rows matching an already-escaped LIKE pattern (all rows when `None`)
pub async fn count_tags<'e, E>(executor: E, pattern: Option<&str>) -> Result<i64>
where
    E: SqliteExecutor<'e>,
{
    let total = match pattern {
        Some(pattern) => {
            sqlx::query_scalar("SELECT COUNT(*) FROM tags WHERE tag LIKE ? ESCAPE '\\'")
                .bind(pattern)
                .fetch_one(executor)
                .await?
        }
        None => {
            sqlx::query_scalar("SELECT COUNT(*) FROM tags")
                .fetch_one(executor)
                .await?
        }
    };
    Ok(total)
}

/// One page of registry rows ordered by name
pub async fn list_tags_page<'e, E>(
    executor: E,
    pattern: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TagRecord>>
where
    E: SqliteExecutor<'e>,
{
    let records = match pattern {
        Some(pattern) => {
            sqlx::query_as::<_, TagRecord>(
                r#"
                SELECT tag, created_at, updated_at, source FROM tags
                WHERE tag LIKE ? ESCAPE '\'
                ORDER BY tag LIMIT ? OFFSET ?
                "#,
            )
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?
        }
        None => {
            sqlx::query_as::<_, TagRecord>(
                "SELECT tag, created_at, updated_at, source FROM tags ORDER BY tag LIMIT ? OFFSET ?",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(executor)
            .await?
        }
    };
    Ok(records)
}
