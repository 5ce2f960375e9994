//! Synthetic generator runs against a real database

mod helpers;

use helpers::*;
use insightsim_common::config::DataConfig;
use insightsim_common::{Error, GenerationEvent};
use insightsim_server::services::generator::{self, GenerationRequest, TagScope};
use insightsim_server::services::tag_registry;
use sqlx::SqlitePool;
use tokio::sync::mpsc;

fn request(tag: Option<&str>, start: &str, end: &str) -> GenerationRequest {
    GenerationRequest {
        tag: tag.map(str::to_string),
        start: Some(start.to_string()),
        end: Some(end.to_string()),
        frequency: Some("1min".to_string()),
        min_value: Some(10.0),
        max_value: Some(20.0),
        mode: Some("uniform".to_string()),
        seed: Some(1234),
    }
}

/// Prepare and run to completion, returning the outcome and every emitted event
async fn generate(
    pool: &SqlitePool,
    request: GenerationRequest,
) -> (insightsim_common::Result<u64>, Vec<GenerationEvent>) {
    let plan = match generator::prepare(pool, &DataConfig::default(), request).await {
        Ok(plan) => plan,
        Err(e) => return (Err(e), Vec::new()),
    };
    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = generator::run(pool.clone(), plan, tx).await;

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    (outcome, events)
}

async fn values(pool: &SqlitePool, tag: &str) -> Vec<(i64, f64, i64)> {
    sqlx::query_as("SELECT timestamp, value, quality FROM insight_raws WHERE tag = ? ORDER BY timestamp")
        .bind(tag)
        .fetch_all(pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_single_tag_three_ticks() {
    let (_dir, pool) = create_test_db().await;
    tag_registry::create(&pool, "X", None).await.unwrap();

    let (outcome, events) = generate(
        &pool,
        request(Some("X"), "2025-01-01T00:00:00", "2025-01-01T00:02:00"),
    )
    .await;

    assert_eq!(outcome.unwrap(), 3);
    let rows = values(&pool, "X").await;
    let timestamps: Vec<i64> = rows.iter().map(|r| r.0).collect();
    assert_eq!(
        timestamps,
        vec![JAN_1_2025, JAN_1_2025 + MINUTE_MS, JAN_1_2025 + 2 * MINUTE_MS]
    );
    for (_, value, quality) in rows {
        assert!((10.0..=20.0).contains(&value));
        assert_eq!(quality, 3);
    }

    assert_eq!(
        events,
        vec![
            GenerationEvent::TagComplete { tag: "X".to_string(), records: 3 },
            GenerationEvent::Done { count: 3, tags_count: 1 },
        ]
    );
}

#[tokio::test]
async fn test_tick_coverage_per_tag() {
    let (_dir, pool) = create_test_db().await;
    for tag in ["A", "B"] {
        tag_registry::create(&pool, tag, None).await.unwrap();
    }

    let mut req = request(None, "2025-01-01T00:00:00", "2025-01-01T05:07:00");
    req.frequency = Some("15min".to_string());
    let (outcome, events) = generate(&pool, req).await;

    // floor(307 / 15) + 1
    let per_tag = 307 / 15 + 1;
    assert_eq!(outcome.unwrap(), 2 * per_tag as u64);
    assert_eq!(count(&pool, Some("A")).await, per_tag);
    assert_eq!(count(&pool, Some("B")).await, per_tag);

    let kinds: Vec<&str> = events.iter().map(|e| e.event_type()).collect();
    assert_eq!(kinds, vec!["tag_complete", "tag_complete", "done"]);
}

#[tokio::test]
async fn test_sequential_mode_stays_in_range() {
    let (_dir, pool) = create_test_db().await;
    tag_registry::create(&pool, "S", None).await.unwrap();

    let mut req = request(Some("S"), "2025-01-01T00:00:00", "2025-01-02T00:00:00");
    req.mode = Some("sequential".to_string());
    let (outcome, _) = generate(&pool, req).await;
    outcome.unwrap();

    let rows = values(&pool, "S").await;
    assert_eq!(rows.len(), 1441);
    assert!(rows.iter().all(|(_, v, _)| (10.0..=20.0).contains(v)));
}

#[tokio::test]
async fn test_unknown_tag_rejected_without_side_effects() {
    let (_dir, pool) = create_test_db().await;
    put(&pool, "KEEP", JAN_1_2025, 1.0, 3).await;

    let (outcome, events) = generate(
        &pool,
        request(Some("GHOST"), "2025-01-01T00:00:00", "2025-01-01T00:02:00"),
    )
    .await;

    match outcome {
        Err(Error::NotFound(msg)) => assert!(msg.contains("GHOST")),
        other => panic!("expected not found, got {:?}", other),
    }
    assert!(events.is_empty());
    assert_eq!(count(&pool, None).await, 1);
}

#[tokio::test]
async fn test_invalid_range_and_window_rejected() {
    let (_dir, pool) = create_test_db().await;
    put(&pool, "KEEP", JAN_1_2025, 1.0, 3).await;

    let mut bad_range = request(None, "2025-01-01T00:00:00", "2025-01-01T00:02:00");
    bad_range.min_value = Some(20.0);
    bad_range.max_value = Some(20.0);
    assert!(matches!(generate(&pool, bad_range).await.0, Err(Error::InvalidInput(_))));

    let backwards = request(None, "2025-01-02T00:00:00", "2025-01-01T00:00:00");
    assert!(matches!(generate(&pool, backwards).await.0, Err(Error::InvalidInput(_))));

    let mut bad_freq = request(None, "2025-01-01T00:00:00", "2025-01-01T00:02:00");
    bad_freq.frequency = Some("2min".to_string());
    assert!(matches!(generate(&pool, bad_freq).await.0, Err(Error::InvalidInput(_))));

    assert_eq!(count(&pool, None).await, 1, "validation must not touch storage");
}

#[tokio::test]
async fn test_overflowing_range_rejected_before_delete() {
    let (_dir, pool) = create_test_db().await;
    put(&pool, "X", JAN_1_2025, 7.0, 3).await;

    let mut wide = request(Some("X"), "2025-01-01T00:00:00", "2025-01-01T00:02:00");
    wide.min_value = Some(-1e308);
    wide.max_value = Some(1e308);
    let (outcome, events) = generate(&pool, wide).await;

    assert!(matches!(outcome, Err(Error::InvalidInput(_))));
    assert!(events.is_empty());
    assert_eq!(get(&pool, "X", JAN_1_2025).await.map(|s| s.value), Some(7.0));
}

#[tokio::test]
async fn test_single_scope_only_replaces_that_tag() {
    let (_dir, pool) = create_test_db().await;
    put(&pool, "X", JAN_1_2025 - DAY_MS, 99.0, 9).await;
    put(&pool, "Y", JAN_1_2025, 5.0, 3).await;

    let (outcome, _) = generate(
        &pool,
        request(Some("X"), "2025-01-01T00:00:00", "2025-01-01T00:02:00"),
    )
    .await;
    outcome.unwrap();

    assert_eq!(count(&pool, Some("X")).await, 3, "old X rows removed");
    assert_eq!(count(&pool, Some("Y")).await, 1, "Y untouched");
}

#[tokio::test]
async fn test_all_scope_clears_entire_store() {
    let (_dir, pool) = create_test_db().await;
    put(&pool, "A", JAN_1_2025 - DAY_MS, 1.0, 3).await;
    // Sample whose tag is not registered
    insightsim_server::db::samples::upsert_sample(
        &pool,
        &insightsim_common::db::Sample::new("ORPHAN", JAN_1_2025, 1.0, 3),
    )
    .await
    .unwrap();

    let (outcome, _) = generate(&pool, request(None, "2025-01-01T00:00:00", "2025-01-01T00:01:00")).await;
    outcome.unwrap();

    assert_eq!(count(&pool, Some("ORPHAN")).await, 0);
    assert_eq!(count(&pool, Some("A")).await, 2);
}

#[tokio::test]
async fn test_same_seed_reproduces_run() {
    let (_dir, pool) = create_test_db().await;
    tag_registry::create(&pool, "R", None).await.unwrap();

    let window = ("2025-01-01T00:00:00", "2025-01-01T01:00:00");
    let mut req = request(Some("R"), window.0, window.1);
    req.mode = Some("sequential".to_string());

    generate(&pool, req.clone()).await.0.unwrap();
    let first = values(&pool, "R").await;
    generate(&pool, req).await.0.unwrap();
    let second = values(&pool, "R").await;

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_plan_defaults_from_config() {
    let (_dir, pool) = create_test_db().await;
    let mut config = DataConfig::default();
    config.use_sequential_generation = true;

    let plan = generator::prepare(&pool, &config, GenerationRequest::default())
        .await
        .unwrap();

    assert_eq!(plan.scope, TagScope::All);
    assert!(plan.tags.is_empty());
    assert_eq!(plan.mode, generator::GenerationMode::Sequential);
    assert_eq!(plan.range, config.value_range);
    assert_eq!(plan.frequency, generator::Frequency::OneMinute);
}

#[tokio::test]
async fn test_small_batches_commit_everything() {
    let (_dir, pool) = create_test_db().await;
    tag_registry::create(&pool, "B", None).await.unwrap();

    let mut config = DataConfig::default();
    config.generation_batch_size = 7;
    let plan = generator::prepare(
        &pool,
        &config,
        request(Some("B"), "2025-01-01T00:00:00", "2025-01-01T00:59:00"),
    )
    .await
    .unwrap();

    let (tx, _rx) = mpsc::unbounded_channel();
    assert_eq!(generator::run(pool.clone(), plan, tx).await.unwrap(), 60);
    assert_eq!(count(&pool, Some("B")).await, 60);
}

#[tokio::test]
async fn test_run_continues_without_consumer() {
    let (_dir, pool) = create_test_db().await;
    tag_registry::create(&pool, "D", None).await.unwrap();

    let plan = generator::prepare(
        &pool,
        &DataConfig::default(),
        request(Some("D"), "2025-01-01T00:00:00", "2025-01-01T00:09:00"),
    )
    .await
    .unwrap();

    let (tx, rx) = mpsc::unbounded_channel();
    drop(rx);
    assert_eq!(generator::run(pool.clone(), plan, tx).await.unwrap(), 10);
}

#[tokio::test]
async fn test_storage_failure_keeps_committed_batches() {
    let (_dir, pool) = create_test_db().await;
    for tag in ["A", "B", "C"] {
        tag_registry::create(&pool, tag, None).await.unwrap();
    }

    // Storage refuses the 8th row: A (5 rows) and B's first batch (2 rows) fit
    sqlx::query(
        r#"
        CREATE TRIGGER refuse_after_seven BEFORE INSERT ON insight_raws
        WHEN (SELECT COUNT(*) FROM insight_raws) >= 7
        BEGIN
            SELECT RAISE(ABORT, 'storage full');
        END
        "#,
    )
    .execute(&pool)
    .await
    .unwrap();

    let mut config = DataConfig::default();
    config.generation_batch_size = 2;
    let plan = generator::prepare(
        &pool,
        &config,
        request(None, "2025-01-01T00:00:00", "2025-01-01T00:04:00"),
    )
    .await
    .unwrap();
    assert_eq!(plan.ticks_per_tag(), 5);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let outcome = generator::run(pool.clone(), plan, tx).await;
    assert!(outcome.is_err());

    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    assert_eq!(events.len(), 2, "events: {:?}", events);
    assert_eq!(
        events[0],
        GenerationEvent::TagComplete { tag: "A".to_string(), records: 5 }
    );
    match &events[1] {
        GenerationEvent::Error { message } => {
            assert!(message.contains("'B'"), "message: {}", message);
            assert!(message.contains("storage full"), "message: {}", message);
        }
        other => panic!("expected terminal error, got {:?}", other),
    }

    assert_eq!(count(&pool, Some("A")).await, 5);
    assert_eq!(count(&pool, Some("B")).await, 2, "B's first batch stays committed");
    assert_eq!(count(&pool, Some("C")).await, 0, "C never generated");
}
