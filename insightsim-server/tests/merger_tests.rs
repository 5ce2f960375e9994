//! Ingestion merge rule, unit atomicity and feed loading

mod helpers;

use helpers::*;
use insightsim_common::db::TagSource;
use insightsim_server::services::feed_loader;
use insightsim_server::services::merger::{merge_unit, FeedDocument};
use insightsim_server::services::query::{query, Granularity};

async fn ingest(pool: &sqlx::SqlitePool, json: &str) -> insightsim_common::Result<u64> {
    let feed = FeedDocument::from_json(json)?;
    merge_unit(pool, &feed, TagSource::Load).await
}

#[tokio::test]
async fn test_tie_favors_incoming() {
    let (_dir, pool) = create_test_db().await;

    ingest(&pool, &feed_json("T", &[("1970-01-01T00:00:01", 5.0, 1)])).await.unwrap();
    let applied = ingest(&pool, &feed_json("T", &[("1970-01-01T00:00:01", 9.0, 1)])).await.unwrap();

    assert_eq!(applied, 1);
    let stored = get(&pool, "T", 1000).await.unwrap();
    assert_eq!(stored.value, 9.0);
    assert_eq!(stored.quality, 1);
}

#[tokio::test]
async fn test_lower_quality_is_skipped() {
    let (_dir, pool) = create_test_db().await;

    ingest(&pool, &feed_json("T", &[("1970-01-01T00:00:01", 5.0, 5)])).await.unwrap();
    let applied = ingest(&pool, &feed_json("T", &[("1970-01-01T00:00:01", 1.0, 2)])).await.unwrap();

    assert_eq!(applied, 0, "skipped rows do not count");
    let stored = get(&pool, "T", 1000).await.unwrap();
    assert_eq!(stored.value, 5.0);
    assert_eq!(stored.quality, 5);
}

#[tokio::test]
async fn test_merge_monotonicity_grid() {
    let (_dir, pool) = create_test_db().await;

    for q0 in 0..4 {
        for q1 in 0..4 {
            let tag = format!("Q{}-{}", q0, q1);
            put(&pool, &tag, 0, 1.0, q0).await;
            put(&pool, &tag, 0, 2.0, q1).await;

            let stored = get(&pool, &tag, 0).await.unwrap();
            let expected = if q1 >= q0 { (2.0, q1) } else { (1.0, q0) };
            assert_eq!((stored.value, stored.quality), expected, "q0={} q1={}", q0, q1);
        }
    }
}

#[tokio::test]
async fn test_one_row_per_key_after_repeated_merges() {
    let (_dir, pool) = create_test_db().await;

    for i in 0..5 {
        put(&pool, "T", JAN_1_2025, i as f64, i % 3).await;
        put(&pool, "T", JAN_1_2025 + MINUTE_MS, i as f64, 3).await;
    }

    assert_eq!(count(&pool, Some("T")).await, 2);
}

#[tokio::test]
async fn test_malformed_timestamp_aborts_whole_unit() {
    let (_dir, pool) = create_test_db().await;

    let json = r#"{"result": {
        "A": [{"timestamp": "2025-01-01T00:00:00", "value": 1.0, "quality": 3}],
        "B": [{"timestamp": "2025-01-01T00:00:00", "value": 1.0, "quality": 3},
              {"timestamp": "not-a-time", "value": 2.0, "quality": 3}]
    }}"#;

    let err = ingest(&pool, json).await.unwrap_err().to_string();
    assert!(err.contains("not-a-time"), "{}", err);
    assert!(err.contains("'B'"), "{}", err);

    assert_eq!(count(&pool, None).await, 0);
    assert_eq!(source_of(&pool, "A").await, None, "registration rolled back too");
}

#[tokio::test]
async fn test_registration_never_overwrites_source() {
    let (_dir, pool) = create_test_db().await;

    insightsim_server::services::tag_registry::create(&pool, "T", Some("custom"))
        .await
        .unwrap();
    ingest(&pool, &feed_json("T", &[("2025-01-01T00:00:00", 1.0, 3)])).await.unwrap();

    assert_eq!(source_of(&pool, "T").await.as_deref(), Some("custom"));
}

#[tokio::test]
async fn test_empty_tag_array_still_registers() {
    let (_dir, pool) = create_test_db().await;

    ingest(&pool, r#"{"result": {"EMPTY": []}}"#).await.unwrap();
    assert_eq!(source_of(&pool, "EMPTY").await.as_deref(), Some("load"));
}

#[tokio::test]
async fn test_ingest_then_query_round_trip() {
    let (_dir, pool) = create_test_db().await;

    let points = [
        ("2025-01-01T00:02:00", 3.0, 3),
        ("2025-01-01T00:00:00", 1.0, 3),
        ("2025-01-01T00:01:00.250", 2.0, 1),
    ];
    ingest(&pool, &feed_json("FLOW", &points)).await.unwrap();
    // Higher quality wins on the second write of 00:00:00
    ingest(&pool, &feed_json("FLOW", &[("2025-01-01T00:00:00Z", 7.0, 5)])).await.unwrap();

    let result = query(
        &pool,
        "2025-01-01T00:00:00",
        "2025-01-01T00:02:00",
        None,
        Granularity::Raw,
    )
    .await
    .unwrap();

    let flow = &result["FLOW"];
    let got: Vec<(&str, f64, i64)> = flow
        .iter()
        .map(|p| (p.timestamp.as_str(), p.value, p.quality))
        .collect();
    assert_eq!(
        got,
        vec![
            ("2025-01-01T00:00:00", 7.0, 5),
            ("2025-01-01T00:01:00.250", 2.0, 1),
            ("2025-01-01T00:02:00", 3.0, 3),
        ]
    );
}

#[tokio::test]
async fn test_load_folder_processes_files_in_name_order() {
    let (dir, pool) = create_test_db().await;
    let folder = dir.path().join("raw_data");
    std::fs::create_dir_all(folder.join("nested.json")).unwrap();

    // Same key in both files; b.json is applied last and wins the tie
    std::fs::write(folder.join("b.json"), feed_json("T", &[("2025-01-01T00:00:00", 2.0, 3)])).unwrap();
    std::fs::write(folder.join("a.JSON"), feed_json("T", &[("2025-01-01T00:00:00", 1.0, 3)])).unwrap();
    std::fs::write(folder.join("notes.txt"), "ignored").unwrap();

    let summary = feed_loader::load_folder(&pool, &folder).await.unwrap();

    assert_eq!(summary.files, 2);
    assert_eq!(summary.records, 2);
    assert_eq!(get(&pool, "T", JAN_1_2025).await.unwrap().value, 2.0);
    assert_eq!(source_of(&pool, "T").await.as_deref(), Some("load"));
}

#[tokio::test]
async fn test_load_folder_stops_at_first_bad_file() {
    let (dir, pool) = create_test_db().await;
    let folder = dir.path().join("raw_data");
    std::fs::create_dir_all(&folder).unwrap();

    std::fs::write(folder.join("1.json"), feed_json("A", &[("2025-01-01T00:00:00", 1.0, 3)])).unwrap();
    std::fs::write(folder.join("2.json"), "{ not json").unwrap();
    std::fs::write(folder.join("3.json"), feed_json("C", &[("2025-01-01T00:00:00", 1.0, 3)])).unwrap();

    let err = feed_loader::load_folder(&pool, &folder).await.unwrap_err().to_string();
    assert!(err.contains("2.json"), "{}", err);

    // Earlier file stays committed, later file never ran
    assert_eq!(count(&pool, Some("A")).await, 1);
    assert_eq!(count(&pool, Some("C")).await, 0);
}

#[tokio::test]
async fn test_load_missing_folder_is_not_found() {
    let (dir, pool) = create_test_db().await;
    let result = feed_loader::load_folder(&pool, &dir.path().join("missing")).await;
    assert!(matches!(result, Err(insightsim_common::Error::NotFound(_))));
}
