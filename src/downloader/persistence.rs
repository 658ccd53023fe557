use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::error::{DownloadError, Result};
use super::task::{DownloadTask, TaskStatus};

pub const DOWNLOADS_KEY: &str = "downloads";
pub const QUEUE_KEY: &str = "download_queue";

/// 持久化的键值存储，值是 JSON 文本
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self, key: &str) -> Result<Option<String>>;
    async fn save(&self, key: &str, blob: &str) -> Result<()>;
}

// 每个键一个 JSON 文件
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl SnapshotStore for JsonFileStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(blob) => Ok(Some(blob)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(DownloadError::IoError(e)),
        }
    }

    async fn save(&self, key: &str, blob: &str) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        // 先写临时文件再改名，避免写到一半的快照
        let target = self.path_for(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, blob).await?;
        tokio::fs::rename(&tmp, &target).await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).map(|v| v.value().clone())
    }

    pub fn insert(&self, key: &str, blob: &str) {
        self.entries.insert(key.to_string(), blob.to_string());
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, blob: &str) -> Result<()> {
        self.insert(key, blob);
        Ok(())
    }
}

/// 历史记录的保留天数
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetentionPolicy {
    pub completed_days: i64,
    pub failed_days: i64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            completed_days: 15,
            failed_days: 7,
        }
    }
}

impl RetentionPolicy {
    pub fn keeps(&self, task: &DownloadTask, now: DateTime<Utc>) -> bool {
        let max_age = match task.status {
            TaskStatus::Active | TaskStatus::Pending | TaskStatus::Paused => return true,
            TaskStatus::Completed => Duration::days(self.completed_days),
            TaskStatus::Failed => Duration::days(self.failed_days),
        };
        let finished_at = task.completed_at.unwrap_or(task.started_at);
        now - finished_at <= max_age
    }

    /// 启动时执行一次，返回保留的任务和被清理的数量
    pub fn sweep(&self, tasks: Vec<DownloadTask>, now: DateTime<Utc>) -> (Vec<DownloadTask>, usize) {
        let before = tasks.len();
        let kept: Vec<DownloadTask> = tasks.into_iter().filter(|t| self.keeps(t, now)).collect();
        let purged = before - kept.len();
        if purged > 0 {
            info!("清理了 {} 条过期的下载记录", purged);
        }
        (kept, purged)
    }
}

// 读取失败只记录日志，按空列表处理
pub async fn load_records<T: DeserializeOwned>(store: &dyn SnapshotStore, key: &str) -> Vec<T> {
    let blob = match store.load(key).await {
        Ok(Some(blob)) => blob,
        Ok(None) => {
            debug!("没有找到快照: {}", key);
            return Vec::new();
        }
        Err(e) => {
            error!("读取快照失败: {}, 错误: {}", key, e);
            return Vec::new();
        }
    };

    match serde_json::from_str(&blob) {
        Ok(records) => records,
        Err(e) => {
            error!("解析快照失败: {}, 错误: {}", key, e);
            Vec::new()
        }
    }
}

pub async fn save_records<T: Serialize>(store: &dyn SnapshotStore, key: &str, records: &[T]) -> Result<()> {
    let blob = serde_json::to_string(records)?;
    store.save(key, &blob).await
}
