mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{FailingStore, RecordingNotifier, RecordingTransport, collaborators, manual, test_settings};
use launcher_downloader::common::config::EngineConfig;
use launcher_downloader::downloader::persistence::{
    self, DOWNLOADS_KEY, JsonFileStore, MemoryStore, RetentionPolicy, SnapshotStore,
};
use launcher_downloader::downloader::profile::ActiveProfile;
use launcher_downloader::downloader::{DownloadManager, DownloadTask, TaskStatus};
use launcher_downloader::queue::RunMode;

fn finished(name: &str, status: TaskStatus, days_ago: i64) -> DownloadTask {
    let now = Utc::now();
    let mut task = DownloadTask::new("https://a/x.zip", name, 10, None, now - Duration::days(days_ago + 1));
    task.status = status;
    task.completed_at = Some(now - Duration::days(days_ago));
    task
}

#[tokio::test]
async fn test_every_change_is_saved() {
    let env = manual(None);
    let task = env.manager.create("https://a/b.zip", "b", None).await;
    env.manager.on_progress(&task.id, 0.3).await;

    let blob = env.store.get(DOWNLOADS_KEY).unwrap();
    let saved: Vec<DownloadTask> = serde_json::from_str(&blob).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].progress_fraction, 0.3);
    assert_eq!(saved[0].status, TaskStatus::Active);
}

#[tokio::test]
async fn test_reload_restores_history() {
    let env = manual(None);
    let task = env.manager.create("https://a/b.zip", "b", None).await;
    env.manager.on_complete(&task.id, "/b").await;
    let before = env.manager.get_download(&task.id).await.unwrap();

    let reloaded = DownloadManager::load(
        test_settings(),
        collaborators(
            Arc::new(RecordingTransport::default()),
            env.store.clone(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(ActiveProfile::new(None)),
        ),
    )
    .await;
    assert_eq!(reloaded.get_download(&task.id).await, Some(before));
}

#[tokio::test]
async fn test_retention_sweep_on_load() {
    let store = Arc::new(MemoryStore::new());
    let mut active = DownloadTask::new("https://a/old.zip", "old-active", 10, None, Utc::now() - Duration::days(40));
    active.status = TaskStatus::Active;
    let tasks = vec![
        finished("completed-16", TaskStatus::Completed, 16),
        finished("completed-14", TaskStatus::Completed, 14),
        finished("failed-8", TaskStatus::Failed, 8),
        finished("failed-6", TaskStatus::Failed, 6),
        active,
    ];
    persistence::save_records(store.as_ref(), DOWNLOADS_KEY, &tasks).await.unwrap();

    let manager = DownloadManager::load(
        test_settings(),
        collaborators(
            Arc::new(RecordingTransport::default()),
            store.clone(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(ActiveProfile::new(None)),
        ),
    )
    .await;

    let mut names: Vec<String> = manager
        .get_all_downloads()
        .await
        .into_iter()
        .map(|t| t.display_name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["completed-14", "failed-6", "old-active"]);

    // 清理结果写回存储
    let saved: Vec<DownloadTask> = serde_json::from_str(&store.get(DOWNLOADS_KEY).unwrap()).unwrap();
    assert_eq!(saved.len(), 3);
    println!("✅ 保留期清理正常");
}

#[test]
fn test_retention_policy_boundaries() {
    let policy = RetentionPolicy::default();
    let now = Utc::now();
    assert!(policy.keeps(&finished("a", TaskStatus::Completed, 14), now));
    assert!(!policy.keeps(&finished("b", TaskStatus::Completed, 16), now));
    assert!(policy.keeps(&finished("c", TaskStatus::Failed, 6), now));
    assert!(!policy.keeps(&finished("d", TaskStatus::Failed, 8), now));

    let mut paused = finished("e", TaskStatus::Paused, 100);
    paused.completed_at = None;
    assert!(policy.keeps(&paused, now));
}

#[tokio::test]
async fn test_failing_store_keeps_memory_state() {
    let manager = DownloadManager::load(
        test_settings(),
        collaborators(
            Arc::new(RecordingTransport::default()),
            Arc::new(FailingStore),
            Arc::new(RecordingNotifier::default()),
            Arc::new(ActiveProfile::new(None)),
        ),
    )
    .await;
    assert!(manager.get_all_downloads().await.is_empty());

    let task = manager.create("https://a/b.zip", "b", None).await;
    manager.on_complete(&task.id, "/b").await;
    assert_eq!(manager.get_download(&task.id).await.unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_corrupt_snapshot_loads_empty() {
    let store = Arc::new(MemoryStore::new());
    store.insert(DOWNLOADS_KEY, "{not json");
    let records: Vec<DownloadTask> = persistence::load_records(store.as_ref(), DOWNLOADS_KEY).await;
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_json_file_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("state"));

    assert_eq!(store.load("downloads").await.unwrap(), None);
    store.save("downloads", "[]").await.unwrap();
    store.save("downloads", "[1]").await.unwrap();
    assert_eq!(store.load("downloads").await.unwrap().as_deref(), Some("[1]"));
    assert!(dir.path().join("state").join("downloads.json").exists());
}

#[tokio::test]
async fn test_config_file_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    tokio::fs::write(&path, r#"{"queue_run_mode": "parallel", "retention": {"failed_days": 3}}"#)
        .await
        .unwrap();

    let config = EngineConfig::load(&path).await.unwrap();
    assert_eq!(config.queue_run_mode, RunMode::Parallel);
    assert_eq!(config.retention.failed_days, 3);
    assert_eq!(config.retention.completed_days, 15);
    assert_eq!(config.placeholder_total_bytes, 100 * 1024 * 1024);

    assert!(EngineConfig::load(dir.path().join("missing.json")).await.is_err());
}
