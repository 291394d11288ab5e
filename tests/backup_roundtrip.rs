#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use std::io::{Cursor, Read, Write};

use finvault_lib::model::Category;
use finvault_lib::store::{fetch_live, insert_batch, ConflictPolicy};
use finvault_lib::{
    read_archive, EngineConfig, EntityKind, EntitySelection, Exporter, ImportMode, Importer,
    RunOutcome,
};
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

fn archive_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut buf = Vec::new();
        file.read_to_end(&mut buf).unwrap();
        entries.push((file.name().to_string(), buf));
    }
    entries
}

fn rezip(entries: &[(String, Vec<u8>)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, bytes) in entries {
        writer.start_file(name.as_str(), FileOptions::default()).unwrap();
        writer.write_all(bytes).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

#[tokio::test]
async fn clean_import_of_full_export_restores_every_count() {
    let pool = util::temp_pool().await;
    let source = util::workspace(&pool, "ws-a").await;
    let target = util::workspace(&pool, "ws-b").await;
    util::seed_dataset(&pool, &source).await;
    let config = EngineConfig::default();

    let archive = Exporter::new(&pool, &config)
        .export(&source, &EntitySelection::all(), &mut |_: f64, _: &str| {})
        .await
        .unwrap();
    for (kind, expected) in util::SEEDED {
        assert_eq!(archive.summary.per_entity_counts[&kind], expected, "{kind}");
    }

    // into an empty workspace and back over the source itself
    for ws in [&target, &source] {
        let payload = read_archive(&archive.bytes, &config).unwrap();
        let report = Importer::new(&pool, &config)
            .import(ws, payload, ImportMode::Clean, &mut |_: f64, _: &str| {})
            .await;
        assert!(report.success, "{:?}", report.errors);
        assert_eq!(report.outcome, RunOutcome::Success);
        for (kind, expected) in util::SEEDED {
            assert_eq!(report.per_entity_counts[&kind], expected, "{kind}");
            assert_eq!(util::count_rows(&pool, ws, kind).await as u64, expected, "{kind}");
        }
    }
}

#[tokio::test]
async fn delimiter_and_quotes_survive_the_archive() {
    let pool = util::temp_pool().await;
    let ws = util::workspace(&pool, "ws-a").await;
    let tricky = util::category("cat-1", "Rent, \"downtown\"; 2nd floor");
    insert_batch(&pool, &ws, &[tricky.clone()], ConflictPolicy::Fail)
        .await
        .unwrap();
    let config = EngineConfig::default();

    let archive = Exporter::new(&pool, &config)
        .export(
            &ws,
            &EntitySelection::only(&[EntityKind::Category]),
            &mut |_: f64, _: &str| {},
        )
        .await
        .unwrap();
    let payload = read_archive(&archive.bytes, &config).unwrap();
    assert_eq!(payload.categories, Some(vec![tricky.clone()]));

    let other = util::workspace(&pool, "ws-b").await;
    let report = Importer::new(&pool, &config)
        .import(&other, payload, ImportMode::Clean, &mut |_: f64, _: &str| {})
        .await;
    assert!(report.success);
    let restored: Vec<Category> = fetch_live(&pool, &other).await.unwrap();
    assert_eq!(restored, vec![tricky]);
}

#[tokio::test]
async fn archive_holds_selected_tables_and_both_manifests() {
    let pool = util::temp_pool().await;
    let ws = util::workspace(&pool, "ws-a").await;
    util::seed_dataset(&pool, &ws).await;
    let config = EngineConfig::default();

    let mut seen = Vec::new();
    let archive = Exporter::new(&pool, &config)
        .export(
            &ws,
            &EntitySelection::only(&[
                EntityKind::MonthlyGoal,
                EntityKind::Category,
                EntityKind::Account,
            ]),
            &mut |percent: f64, label: &str| seen.push((percent, label.to_string())),
        )
        .await
        .unwrap();

    assert!(archive.filename.starts_with("backup-ws-a-"));
    assert!(archive.filename.ends_with(".zip"));

    let percents: Vec<f64> = seen.iter().map(|(p, _)| *p).collect();
    assert_eq!(percents.len(), 3);
    assert!((percents[0] - 100.0 / 3.0).abs() < 1e-9);
    assert_eq!(percents[2], 100.0);
    let labels: Vec<&str> = seen.iter().map(|(_, l)| l.as_str()).collect();
    assert_eq!(labels, vec!["Categories", "Accounts", "Monthly goals"]);

    let entries = archive_entries(&archive.bytes);
    let mut names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
    names.sort();
    assert_eq!(
        names,
        vec!["accounts.csv", "categories.csv", "manifest.json", "manifest.txt", "monthly_goals.csv"]
    );

    let text = entries
        .iter()
        .find(|(n, _)| n == "manifest.txt")
        .map(|(_, b)| String::from_utf8(b.clone()).unwrap())
        .unwrap();
    assert!(text.contains("total_rows: 6"));
    assert!(text.contains("  categories: 2"));
    assert!(text.contains("monthly_goals: ok 2 rows"));

    let categories = entries
        .iter()
        .find(|(n, _)| n == "categories.csv")
        .map(|(_, b)| String::from_utf8(b.clone()).unwrap())
        .unwrap();
    assert!(categories.starts_with("id,name,kind,icon,color,enabled\n"));
    assert!(!categories.contains("cat-hidden"));
}

#[tokio::test]
async fn tampered_table_is_rejected() {
    let pool = util::temp_pool().await;
    let ws = util::workspace(&pool, "ws-a").await;
    util::seed_dataset(&pool, &ws).await;
    let config = EngineConfig::default();

    let archive = Exporter::new(&pool, &config)
        .export(&ws, &EntitySelection::all(), &mut |_: f64, _: &str| {})
        .await
        .unwrap();
    let mut entries = archive_entries(&archive.bytes);
    for (name, bytes) in entries.iter_mut() {
        if name == "accounts.csv" {
            let text = String::from_utf8(bytes.clone()).unwrap();
            *bytes = text.replace("First Bank", "Other Bank").into_bytes();
        }
    }

    let err = read_archive(&rezip(&entries), &config).unwrap_err();
    let err = finvault_lib::AppError::from(err);
    assert_eq!(err.code(), "ARCHIVE/CHECKSUM");
    assert_eq!(err.context()["file"], "accounts.csv");
}

#[tokio::test]
async fn export_rejects_empty_selection() {
    let pool = util::temp_pool().await;
    let ws = util::workspace(&pool, "ws-a").await;
    let config = EngineConfig::default();
    let err = Exporter::new(&pool, &config)
        .export(&ws, &EntitySelection::default(), &mut |_: f64, _: &str| {})
        .await
        .unwrap_err();
    assert_eq!(err.code(), "SELECTION/EMPTY");
}

#[tokio::test]
async fn unreadable_table_aborts_export_naming_the_entity() {
    let pool = util::temp_pool().await;
    let ws = util::workspace(&pool, "ws-a").await;
    util::seed_dataset(&pool, &ws).await;
    sqlx::query(
        "UPDATE transactions SET status = 'archived' WHERE workspace_id = ?1 AND id = 'tx-0003'",
    )
    .bind(ws.as_str())
    .execute(&pool)
    .await
    .unwrap();
    let config = EngineConfig::default();

    let mut calls = 0;
    let err = Exporter::new(&pool, &config)
        .export(&ws, &EntitySelection::all(), &mut |_: f64, _: &str| calls += 1)
        .await
        .unwrap_err();
    assert_eq!(err.code(), "STORE/READ");
    assert_eq!(err.context()["entity"], "transactions");
    // categories through cost centers finished before the failure
    assert_eq!(calls, 5);
}
