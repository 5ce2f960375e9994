//! Shared test utilities
#![allow(dead_code)]

use insightsim_common::config::AppConfig;
use insightsim_common::db::init::init_database;
use insightsim_common::db::{Sample, TagSource};
use insightsim_server::db::samples;
use insightsim_server::services::tag_registry;
use sqlx::SqlitePool;
use tempfile::TempDir;

/// 2025-01-01T00:00:00Z in milliseconds
pub const JAN_1_2025: i64 = 1_735_689_600_000;
pub const MINUTE_MS: i64 = 60_000;
pub const DAY_MS: i64 = 86_400_000;

/// Create temporary test database with migrations applied
///
/// Returns (TempDir, SqlitePool) - TempDir must be kept alive for duration of test
pub async fn create_test_db() -> (TempDir, SqlitePool) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let db_path = temp_dir.path().join("test_insightsim.db");
    let pool = init_database(&db_path).await.expect("init test database");
    (temp_dir, pool)
}

/// Default configuration pointing the raw-data folder into `dir`
pub fn test_config(dir: &TempDir) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.path = dir.path().join("test_insightsim.db");
    config.data.raw_data_folder = dir.path().join("raw_data");
    config
}

/// Write a sample directly through the merge rule, registering the tag
pub async fn put(pool: &SqlitePool, tag: &str, timestamp_ms: i64, value: f64, quality: i64) {
    tag_registry::register_if_absent(pool, tag, TagSource::Load)
        .await
        .expect("register tag");
    samples::upsert_sample(pool, &Sample::new(tag, timestamp_ms, value, quality))
        .await
        .expect("upsert sample");
}

pub async fn get(pool: &SqlitePool, tag: &str, timestamp_ms: i64) -> Option<Sample> {
    samples::get_sample(pool, tag, timestamp_ms)
        .await
        .expect("get sample")
}

pub async fn count(pool: &SqlitePool, tag: Option<&str>) -> i64 {
    samples::count_samples(pool, tag).await.expect("count samples")
}

pub async fn source_of(pool: &SqlitePool, tag: &str) -> Option<String> {
    insightsim_server::db::tags::get_tag(pool, tag)
        .await
        .expect("get tag")
        .map(|record| record.source)
}

/// Feed document JSON for one tag
pub fn feed_json(tag: &str, points: &[(&str, f64, i64)]) -> String {
    let points: Vec<serde_json::Value> = points
        .iter()
        .map(|(ts, value, quality)| {
            serde_json::json!({ "timestamp": ts, "value": value, "quality": quality })
        })
        .collect();
    serde_json::json!({ "result": { tag: points } }).to_string()
}
