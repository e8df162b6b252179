use super::*;
use crate::config::AppPaths;
use crate::error::AppError;
use crate::fs::{FileSystem, MemoryFileSystem};
use chrono::{TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const PROJECT: &str = "/work/project";
const CONFIG: &str = "/home/tester/.config/ai-cli";

fn paths() -> AppPaths {
    AppPaths::new(PROJECT, CONFIG)
}

fn setup() -> (Arc<MemoryFileSystem>, RunManager) {
    let fs = Arc::new(MemoryFileSystem::new());
    let manager = RunManager::new(fs.clone(), paths());
    (fs, manager)
}

fn sample_run(name: &str) -> RunInfo {
    RunInfo {
        run_name: name.to_string(),
        run_directory: PathBuf::from(PROJECT).join("runs").join(name),
        timestamp: "2025-03-04T05:06:07.089Z".to_string(),
        sequential_number: 7,
    }
}

#[test]
fn test_generate_run_name_format() {
    let at = Utc.with_ymd_and_hms(2025, 3, 4, 5, 6, 7).unwrap();

    assert_eq!(
        generate_run_name(Some("exp"), 12, at),
        "exp-0012-2025-03-04T05-06-07-000Z"
    );
    assert_eq!(generate_run_name(None, 1, at), "0001-2025-03-04T05-06-07-000Z");
    assert_eq!(generate_run_name(Some(""), 1, at), "0001-2025-03-04T05-06-07-000Z");
}

#[tokio::test]
async fn test_create_run_builds_directory_tree() {
    let (fs, mut manager) = setup();

    let info = manager.create_run_directory(Some("demo")).await.unwrap();

    assert!(info.run_name.starts_with("demo-0001-"));
    assert_eq!(info.sequential_number, 1);
    assert_eq!(info.run_directory, Path::new(PROJECT).join("runs").join(&info.run_name));
    for sub in RUN_SUBDIRECTORIES {
        assert!(fs.is_dir(&info.run_directory.join(sub)), "missing {sub}");
    }

    let metadata = fs.file(&info.run_directory.join(RUN_INFO_FILE)).unwrap();
    let stored: RunInfo = serde_json::from_str(&metadata).unwrap();
    assert_eq!(stored, info);

    let pointer = fs.file(&paths().pointer_file()).unwrap();
    assert_eq!(serde_json::from_str::<RunInfo>(&pointer).unwrap(), info);
}

#[tokio::test]
async fn test_create_run_tolerates_existing_directories() {
    let (fs, mut manager) = setup();
    fs.make_directory(&Path::new(PROJECT).join("runs").join("older"), true)
        .await
        .unwrap();

    manager.create_run_directory(None).await.unwrap();
    manager.create_run_directory(None).await.unwrap();
}

#[tokio::test]
async fn test_sequential_numbers_from_absent_counter() {
    let (fs, mut manager) = setup();

    let mut numbers = Vec::new();
    for _ in 0..3 {
        numbers.push(manager.create_run_directory(None).await.unwrap().sequential_number);
    }
    assert_eq!(numbers, vec![1, 2, 3]);

    // The counter holds the number of the latest run, not the next one
    let counter = fs.file(&paths().counter_file()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&counter).unwrap();
    assert_eq!(value["sequentialNumber"], 3);
}

#[tokio::test]
async fn test_counter_keeps_unrelated_keys() {
    let (fs, mut manager) = setup();
    fs.insert_file(
        paths().counter_file(),
        r#"{ "sequentialNumber": 41, "owner": "ci" }"#,
    );

    let info = manager.create_run_directory(None).await.unwrap();
    assert_eq!(info.sequential_number, 42);

    let value: serde_json::Value =
        serde_json::from_str(&fs.file(&paths().counter_file()).unwrap()).unwrap();
    assert_eq!(value["sequentialNumber"], 42);
    assert_eq!(value["owner"], "ci");
}

#[tokio::test]
async fn test_corrupt_counter_is_an_error() {
    let (fs, mut manager) = setup();
    fs.insert_file(paths().counter_file(), "not json");

    let err = manager.create_run_directory(None).await.unwrap_err();
    assert!(matches!(err, AppError::Parse { .. }));
}

#[tokio::test]
async fn test_exhausted_counter_is_an_error() {
    let (fs, mut manager) = setup();
    fs.insert_file(paths().counter_file(), format!(r#"{{"sequentialNumber": {}}}"#, u64::MAX));

    let err = manager.create_run_directory(None).await.unwrap_err();

    assert!(matches!(err, AppError::CounterOverflow(_)));
    assert_eq!(err.kind(), "CounterOverflowError");
    assert!(!fs.is_dir(&paths().runs_dir()));
    assert!(manager.get_current_run().await.unwrap().is_none());
}

#[tokio::test]
async fn test_prefix_cannot_escape_runs_directory() {
    let (_fs, mut manager) = setup();

    let err = manager.create_run_directory(Some("../outside")).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidRunName(_)));
}

#[tokio::test]
async fn test_pointer_round_trip_across_sessions() {
    let (fs, mut manager) = setup();
    let info = sample_run("shared");

    manager.set_current_run(info.clone()).await.unwrap();

    let mut fresh = RunManager::new(fs.clone(), paths());
    assert_eq!(fresh.get_current_run().await.unwrap(), Some(info.clone()));
    assert_eq!(fresh.get_run_path().await.unwrap(), info.run_directory);
    assert_eq!(
        fresh.get_run_file_path("outputs/result.txt").await.unwrap(),
        info.run_directory.join("outputs/result.txt")
    );
}

#[tokio::test]
async fn test_set_current_run_does_not_validate_directory() {
    let (fs, mut manager) = setup();
    let info = sample_run("ghost");

    manager.set_current_run(info.clone()).await.unwrap();

    assert!(!fs.is_dir(&info.run_directory));
    assert_eq!(manager.get_run_path().await.unwrap(), info.run_directory);
}

#[tokio::test]
async fn test_clear_resets_pointer() {
    let (fs, mut manager) = setup();
    manager.create_run_directory(None).await.unwrap();

    manager.clear_current_run().await.unwrap();

    assert_eq!(fs.file(&paths().pointer_file()).unwrap(), "{}");
    assert!(matches!(
        manager.get_run_path().await.unwrap_err(),
        AppError::NoActiveRun
    ));
    let mut fresh = RunManager::new(fs.clone(), paths());
    assert!(matches!(
        fresh.get_run_file_path("x").await.unwrap_err(),
        AppError::NoActiveRun
    ));
    assert_eq!(fresh.get_current_run().await.unwrap(), None);
}

#[tokio::test]
async fn test_clear_leaves_missing_pointer_absent() {
    let (fs, mut manager) = setup();

    manager.clear_current_run().await.unwrap();

    assert!(fs.file(&paths().pointer_file()).is_none());
    assert_eq!(fs.write_count(), 0);
}

#[tokio::test]
async fn test_malformed_or_incomplete_pointer_means_no_run() {
    let documents = [
        "{ broken",
        "{}",
        r#"{ "runName": "only-name" }"#,
        r#"{ "runName": "", "runDirectory": "/x" }"#,
    ];
    for content in documents {
        let (fs, mut manager) = setup();
        fs.insert_file(paths().pointer_file(), content);

        assert_eq!(manager.get_current_run().await.unwrap(), None, "{content}");
        assert!(matches!(
            manager.get_run_path().await.unwrap_err(),
            AppError::NoActiveRun
        ));
    }
}

#[tokio::test]
async fn test_refresh_sees_other_session_changes() {
    let (fs, mut first) = setup();
    let mut second = RunManager::new(fs.clone(), paths());

    first.set_current_run(sample_run("one")).await.unwrap();
    assert_eq!(second.get_current_run().await.unwrap().unwrap().run_name, "one");

    first.set_current_run(sample_run("two")).await.unwrap();
    // Cached until refreshed
    assert_eq!(second.get_current_run().await.unwrap().unwrap().run_name, "one");
    assert_eq!(second.refresh().await.unwrap().unwrap().run_name, "two");
}

#[tokio::test]
async fn test_use_run_activates_existing_run() {
    let (fs, mut manager) = setup();
    let created = manager.create_run_directory(Some("a")).await.unwrap();
    manager.clear_current_run().await.unwrap();

    let mut other = RunManager::new(fs.clone(), paths());
    let used = other.use_run(&created.run_name).await.unwrap();
    assert_eq!(used, created);
    assert_eq!(manager.refresh().await.unwrap(), Some(created));
}

#[tokio::test]
async fn test_use_run_errors() {
    let (fs, mut manager) = setup();

    assert!(matches!(
        manager.use_run("missing").await.unwrap_err(),
        AppError::RunNotFound(_)
    ));
    for bad in ["../escape", "/abs/path", "a/b", ""] {
        assert!(
            matches!(manager.use_run(bad).await.unwrap_err(), AppError::InvalidRunName(_)),
            "{bad}"
        );
    }

    // Directory without metadata is not a run
    fs.make_directory(&Path::new(PROJECT).join("runs").join("bare"), true)
        .await
        .unwrap();
    assert!(matches!(
        manager.use_run("bare").await.unwrap_err(),
        AppError::RunNotFound(_)
    ));
}

#[tokio::test]
async fn test_list_runs_orders_by_sequence() {
    let (fs, mut manager) = setup();
    assert!(manager.list_runs().await.unwrap().is_empty());

    let first = manager.create_run_directory(Some("z")).await.unwrap();
    let second = manager.create_run_directory(Some("a")).await.unwrap();
    fs.make_directory(&Path::new(PROJECT).join("runs").join("stray"), true)
        .await
        .unwrap();

    let runs = manager.list_runs().await.unwrap();
    assert_eq!(runs, vec![first, second]);
}
