//! Database schema migrations
//!
//! Versioned schema migrations so existing databases upgrade in place.
//!
//! # Migration Guidelines
//!
//! 1. **Never modify existing migrations** - databases in the field already ran them
//! 2. **Always add new migrations** - one function per schema change
//! 3. **Keep them idempotent** - `IF NOT EXISTS` / existence checks everywhere
//!
//! # History
//!
//! - v1: `insight_raws` sample table with `(tag, timestamp)` uniqueness
//! - v2: `tags` registry table, backfilled from tags already holding samples

use crate::Result;
use sqlx::SqlitePool;
use tracing::{info, warn};

/// Current schema version
///
/// **IMPORTANT:** Increment this when adding new migrations
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Get current schema version from database
///
/// Returns 0 if schema_version table doesn't exist or has no rows
pub async fn get_schema_version(pool: &SqlitePool) -> Result<i32> {
    let table_exists: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS(
            SELECT 1 FROM sqlite_master
            WHERE type='table' AND name='schema_version'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        return Ok(0);
    }

    let version: Option<i32> =
        sqlx::query_scalar("SELECT version FROM schema_version ORDER BY version DESC LIMIT 1")
            .fetch_optional(pool)
            .await?;

    Ok(version.unwrap_or(0))
}

/// Set schema version in database
async fn set_schema_version(pool: &SqlitePool, version: i32) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO schema_version (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_schema_version_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Run all pending migrations
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    create_schema_version_table(pool).await?;
    let current_version = get_schema_version(pool).await?;

    if current_version == CURRENT_SCHEMA_VERSION {
        info!("Database schema is up to date (v{})", current_version);
        return Ok(());
    }

    if current_version > CURRENT_SCHEMA_VERSION {
        warn!(
            "Database schema version ({}) is newer than code version ({})",
            current_version, CURRENT_SCHEMA_VERSION
        );
        warn!("This may indicate a downgrade. Proceeding with caution.");
        return Ok(());
    }

    info!(
        "Running database migrations: v{} -> v{}",
        current_version, CURRENT_SCHEMA_VERSION
    );

    if current_version < 1 {
        migrate_v1(pool).await?;
        set_schema_version(pool, 1).await?;
        info!("✓ Migration v1 completed");
    }

    if current_version < 2 {
        migrate_v2(pool).await?;
        set_schema_version(pool, 2).await?;
        info!("✓ Migration v2 completed");
    }

    info!("All migrations completed successfully");
    Ok(())
}

/// Migration v1: sample table
///
/// `UNIQUE(tag, timestamp)` is the identity of a sample; the composite index
/// serves the per-tag range scans of the query engine.
async fn migrate_v1(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v1: Create insight_raws");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS insight_raws (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tag TEXT NOT NULL,
            timestamp INTEGER NOT NULL,
            value REAL NOT NULL,
            quality INTEGER NOT NULL,
            UNIQUE(tag, timestamp)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_tag_timestamp ON insight_raws(tag, timestamp)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Migration v2: tag registry
///
/// **Background:** Databases created before the registry existed only know
/// their tags implicitly through `insight_raws`. Every distinct tag found there
/// gets a registry row with source `load`.
async fn migrate_v2(pool: &SqlitePool) -> Result<()> {
    info!("Running migration v2: Create tags registry");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tags (
            tag TEXT PRIMARY KEY,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'custom'
        )
        "#,
    )
    .execute(pool)
    .await?;

    let now = crate::time::now_rfc3339();
    let backfilled = sqlx::query(
        r#"
        INSERT OR IGNORE INTO tags (tag, created_at, updated_at, source)
        SELECT DISTINCT tag, ?, ?, 'load' FROM insight_raws
        "#,
    )
    .bind(&now)
    .bind(&now)
    .execute(pool)
    .await?
    .rows_affected();

    if backfilled > 0 {
        info!("  ✓ Backfilled {} tags from existing samples", backfilled);
    }

    Ok(())
}
