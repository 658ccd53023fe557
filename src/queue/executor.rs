use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use super::manager::QueueManager;
use super::models::QueueItem;
use crate::downloader::error::{DownloadError, Result};
use crate::downloader::manager::{DownloadManager, TrackedRequest};
use crate::downloader::models::{TaskOutcome, filename_from_url, sanitize_filename};

/// 把执行器的进度写回对应的队列项
pub struct ProgressReporter {
    queue: QueueManager,
    item_id: String,
}

impl ProgressReporter {
    pub(crate) fn new(queue: QueueManager, item_id: &str) -> Self {
        Self {
            queue,
            item_id: item_id.to_string(),
        }
    }

    pub async fn report(&self, fraction: f64) {
        self.queue.report_progress(&self.item_id, fraction).await;
    }
}

/// 真正执行一个队列项，成功时返回保存路径
#[async_trait]
pub trait QueueExecutor: Send + Sync {
    async fn execute(&self, item: &QueueItem, progress: &ProgressReporter) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub url: String,
    pub filename: String,
}

/// 按版本、加载器和平台查找可下载的文件
#[async_trait]
pub trait CatalogResolver: Send + Sync {
    async fn resolve(&self, item: &QueueItem) -> Result<Option<ResolvedFile>>;
}

/// 不查目录，直接把内容 id 当作下载地址
pub struct DirectUrlResolver;

#[async_trait]
impl CatalogResolver for DirectUrlResolver {
    async fn resolve(&self, item: &QueueItem) -> Result<Option<ResolvedFile>> {
        let Ok(url) = Url::parse(&item.original_content_id) else {
            return Ok(None);
        };
        if !matches!(url.scheme(), "http" | "https") {
            return Ok(None);
        }
        let filename = filename_from_url(url.as_str())
            .unwrap_or_else(|| format!("{}.bin", sanitize_filename(&item.display_name)));

        Ok(Some(ResolvedFile {
            url: url.to_string(),
            filename,
        }))
    }
}

/// 解析文件后交给下载管理器，等待传输结束
pub struct TransferExecutor<R> {
    downloads: DownloadManager,
    resolver: R,
    owner_profile: Option<String>,
}

impl<R: CatalogResolver> TransferExecutor<R> {
    pub fn new(downloads: DownloadManager, resolver: R, owner_profile: Option<String>) -> Self {
        Self {
            downloads,
            resolver,
            owner_profile,
        }
    }
}

#[async_trait]
impl<R: CatalogResolver> QueueExecutor for TransferExecutor<R> {
    async fn execute(&self, item: &QueueItem, progress: &ProgressReporter) -> Result<String> {
        let file = self
            .resolver
            .resolve(item)
            .await?
            .ok_or_else(|| DownloadError::NoCompatibleFile {
                content_id: item.original_content_id.clone(),
                version: item.version.clone(),
            })?;
        debug!("队列项 {} 解析到文件: {}", item.id, file.url);

        let target = Path::new(&item.destination_path).join(&file.filename);
        let mut watch = self
            .downloads
            .start_tracked(TrackedRequest {
                source: file.url,
                filename: target.to_string_lossy().into_owned(),
                display_name: item.display_name.clone(),
                bytes_estimate: self.downloads.settings().placeholder_total_bytes,
                owner_profile: self.owner_profile.clone(),
                group_id: None,
            })
            .await;
        debug!("队列项 {} 对应下载任务 {}", item.id, watch.task_id());

        while let Some(task) = watch.next().await {
            if task.status.is_terminal() {
                break;
            }
            progress.report(task.progress_fraction).await;
        }

        match watch.outcome() {
            TaskOutcome::Completed { path } => {
                info!("队列项文件已保存: {}", path);
                Ok(path)
            }
            TaskOutcome::Failed { message } => Err(DownloadError::Transport(message)),
        }
    }
}
