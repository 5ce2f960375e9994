//! Tag registry
//!
//! Authoritative catalog of tag names with provenance metadata. Writers
//! register tags as a side effect through [`register_if_absent`]; explicit
//! management goes through [`create`] and [`delete`].

use insightsim_common::db::{TagRecord, TagSource};
use insightsim_common::tag_list::TagList;
use insightsim_common::{time, Error, Result};
use serde::Serialize;
use sqlx::{SqliteExecutor, SqlitePool};
use std::path::Path;
use tracing::{debug, info};

use crate::db::{samples, tags};
use crate::pagination::Pagination;

/// One page of the registry listing
#[derive(Debug, Clone, Serialize)]
pub struct TagPage {
    pub items: Vec<TagRecord>,
    /// Rows matching the search, across all pages
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

/// Escape `%`, `_` and `\` so the search text matches literally inside LIKE
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// List one page of tags ordered by name
///
/// `search` is a trimmed, case-insensitive literal substring filter.
pub async fn list_page(
    pool: &SqlitePool,
    pagination: Pagination,
    search: Option<&str>,
) -> Result<TagPage> {
    let pattern = search
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));

    let total = tags::count_tags(pool, pattern.as_deref()).await?;
    let items =
        tags::list_tags_page(pool, pattern.as_deref(), pagination.limit, pagination.offset).await?;

    Ok(TagPage {
        items,
        total,
        page: pagination.page,
        limit: pagination.limit,
    })
}

/// Every registered name, ordered
pub async fn list_all_names(pool: &SqlitePool) -> Result<Vec<String>> {
    tags::list_tag_names(pool).await
}

/// Create a tag explicitly
///
/// `source` defaults to `custom`. A duplicate name is [`Error::AlreadyExists`].
pub async fn create(pool: &SqlitePool, name: &str, source: Option<&str>) -> Result<TagRecord> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("tag is required and cannot be empty".to_string()));
    }

    let source = match source.map(str::trim).filter(|s| !s.is_empty()) {
        Some(literal) => literal.parse::<TagSource>()?,
        None => TagSource::default(),
    };

    let now = time::now_rfc3339();
    match tags::insert_tag(pool, name, source, &now).await {
        Ok(()) => {}
        Err(e) if e.is_unique_violation() => {
            return Err(Error::AlreadyExists(format!("tag '{}' already exists", name)));
        }
        Err(e) => return Err(e),
    }

    info!(tag = %name, source = %source, "Created tag");

    Ok(TagRecord {
        tag: name.to_string(),
        created_at: now.clone(),
        updated_at: now,
        source: source.as_str().to_string(),
    })
}

/// Register a tag on first sight; an existing row (and its `source`) is left alone
pub async fn register_if_absent<'e, E>(executor: E, name: &str, source: TagSource) -> Result<bool>
where
    E: SqliteExecutor<'e>,
{
    let created = tags::insert_tag_if_absent(executor, name, source, &time::now_rfc3339()).await?;
    if created {
        debug!(tag = %name, source = %source, "Registered tag");
    }
    Ok(created)
}

/// Refresh `updated_at` after a writer touched the tag's data
pub async fn touch<'e, E>(executor: E, name: &str) -> Result<()>
where
    E: SqliteExecutor<'e>,
{
    tags::touch_tag(executor, name, &time::now_rfc3339()).await?;
    Ok(())
}

/// Delete a tag and all of its samples in one transaction
///
/// Returns the number of samples removed.
pub async fn delete(pool: &SqlitePool, name: &str) -> Result<u64> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidInput("missing query param: tag".to_string()));
    }

    let mut tx = pool.begin().await?;

    let removed_samples = samples::delete_samples_for_tag(&mut *tx, name).await?;
    if !tags::delete_tag_row(&mut *tx, name).await? {
        // Dropping the transaction rolls back the sample delete
        return Err(Error::NotFound(format!("tag '{}' not found", name)));
    }

    tx.commit().await?;

    info!(tag = %name, samples = removed_samples, "Deleted tag");
    Ok(removed_samples)
}

/// Register every name from a legacy tag-list file with source `load`
///
/// Returns the number of names newly added to the registry.
pub async fn seed_from_tag_list(pool: &SqlitePool, path: &Path) -> Result<usize> {
    let list = TagList::from_file(path)?;

    let mut tx = pool.begin().await?;
    let mut added = 0;
    for name in &list.tags {
        if register_if_absent(&mut *tx, name, TagSource::Load).await? {
            added += 1;
        }
    }
    tx.commit().await?;

    info!(
        "Seeded tag registry from {}: {} listed, {} new",
        path.display(),
        list.tags.len(),
        added
    );
    Ok(added)
}
