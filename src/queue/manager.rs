use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::executor::{ProgressReporter, QueueExecutor};
use super::models::{QueueItem, QueueItemRequest, QueueStatus, RunMode, RunSummary};
use crate::downloader::error::DownloadError;
use crate::downloader::observer::{ObserverBus, Subscription};
use crate::downloader::persistence::{self, QUEUE_KEY, SnapshotStore};
use crate::downloader::progress;

#[derive(Default)]
struct QueueState {
    items: Vec<QueueItem>,
    version: u64,
}

struct QueueInner {
    state: Mutex<QueueState>,
    store: Arc<dyn SnapshotStore>,
    observers: ObserverBus<QueueItem>,
    counter: AtomicU64,
    // 上一次发布的版本；持有状态锁时获取
    publish_gate: Mutex<u64>,
}

enum ItemResult {
    Completed,
    Failed,
    Skipped,
}

/// 多项下载队列。与下载任务分开保存，按需运行。
#[derive(Clone)]
pub struct QueueManager {
    inner: Arc<QueueInner>,
}

impl QueueManager {
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        Self::with_items(store, Vec::new())
    }

    pub async fn load(store: Arc<dyn SnapshotStore>) -> Self {
        let mut items: Vec<QueueItem> = persistence::load_records(store.as_ref(), QUEUE_KEY).await;

        // 上次运行中断的项重新排队
        let mut interrupted = 0;
        for item in items.iter_mut().filter(|i| i.status == QueueStatus::Downloading) {
            item.status = QueueStatus::Pending;
            item.progress_fraction = None;
            interrupted += 1;
        }
        if interrupted > 0 {
            warn!("{} 个队列项在上次运行中被中断，已重新排队", interrupted);
            if let Err(e) = persistence::save_records(store.as_ref(), QUEUE_KEY, &items).await {
                warn!("写回下载队列失败: {}", e);
            }
        }
        info!("载入 {} 个队列项", items.len());
        Self::with_items(store, items)
    }

    fn with_items(store: Arc<dyn SnapshotStore>, items: Vec<QueueItem>) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState { items, version: 0 }),
                store,
                observers: ObserverBus::new(),
                counter: AtomicU64::new(0),
                publish_gate: Mutex::new(0),
            }),
        }
    }

    // f 返回 None 表示没有变更
    async fn mutate<R>(&self, f: impl FnOnce(&mut Vec<QueueItem>) -> Option<R>) -> Option<R> {
        let (result, version, snapshot, mut published) = {
            let mut state = self.inner.state.lock().await;
            let result = f(&mut state.items)?;
            state.version += 1;
            // 释放状态锁之前排队，发布顺序与提交顺序一致
            let published = self.inner.publish_gate.lock().await;
            (result, state.version, state.items.clone(), published)
        };

        if version > *published {
            *published = version;
            if let Err(e) = persistence::save_records(self.inner.store.as_ref(), QUEUE_KEY, &snapshot).await {
                warn!("保存下载队列失败，仅保留内存状态: {}", e);
            }
            self.inner.observers.publish(&snapshot);
        }
        Some(result)
    }

    // 同一内容重复加入也要得到不同的 id
    fn next_id(&self, original_content_id: &str) -> String {
        let counter = self.inner.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!(
            "{}-{}-{}-{}",
            original_content_id,
            Utc::now().timestamp_millis(),
            counter,
            uuid::Uuid::new_v4().simple()
        )
    }

    pub async fn enqueue(&self, requests: Vec<QueueItemRequest>) -> Vec<QueueItem> {
        if requests.is_empty() {
            return Vec::new();
        }
        let new_items: Vec<QueueItem> = requests
            .into_iter()
            .map(|request| {
                let id = self.next_id(&request.original_content_id);
                QueueItem::from_request(id, request)
            })
            .collect();
        info!("加入下载队列: {} 项", new_items.len());

        self.mutate(|items| {
            items.extend(new_items.iter().cloned());
            Some(())
        })
        .await;
        new_items
    }

    /// 切换启用状态，返回切换后的值。下载中的项不能切换。
    pub async fn toggle_enabled(&self, id: &str) -> Option<bool> {
        self.mutate(|items| {
            let item = items.iter_mut().find(|i| i.id == id)?;
            if item.status == QueueStatus::Downloading {
                debug!("下载中的队列项不能切换: {}", id);
                return None;
            }
            item.enabled = !item.enabled;
            Some(item.enabled)
        })
        .await
    }

    /// 只能移除还没开始的项
    pub async fn remove_item(&self, id: &str) -> bool {
        self.mutate(|items| {
            let index = items
                .iter()
                .position(|i| i.id == id && matches!(i.status, QueueStatus::Pending | QueueStatus::Disabled))?;
            items.remove(index);
            Some(())
        })
        .await
        .is_some()
    }

    pub async fn clear_completed(&self) -> usize {
        self.mutate(|items| {
            let before = items.len();
            items.retain(|i| i.status != QueueStatus::Completed);
            let removed = before - items.len();
            (removed > 0).then_some(removed)
        })
        .await
        .unwrap_or(0)
    }

    /// 把已结束的项放回 Pending，下次运行会再次执行
    pub async fn reset_item(&self, id: &str) -> bool {
        self.mutate(|items| {
            let item = items.iter_mut().find(|i| i.id == id && i.status.is_terminal())?;
            item.status = QueueStatus::Pending;
            item.progress_fraction = None;
            item.error = None;
            Some(())
        })
        .await
        .is_some()
    }

    /// 直接写入状态。禁用的项不能进入 Downloading。
    pub async fn update_item_status(
        &self,
        id: &str,
        status: QueueStatus,
        progress_fraction: Option<f64>,
        error: Option<String>,
    ) -> bool {
        self.mutate(|items| {
            let item = items.iter_mut().find(|i| i.id == id)?;
            if status == QueueStatus::Downloading && !item.enabled {
                debug!("禁用的队列项不能开始下载: {}", id);
                return None;
            }
            item.status = status;
            item.progress_fraction = match status {
                QueueStatus::Downloading => Some(progress::clamp_fraction(progress_fraction.unwrap_or(0.0))),
                _ => None,
            };
            item.error = error;
            Some(())
        })
        .await
        .is_some()
    }

    pub async fn report_progress(&self, id: &str, fraction: f64) -> bool {
        let fraction = progress::round_fraction(fraction);
        self.mutate(|items| {
            let item = items
                .iter_mut()
                .find(|i| i.id == id && i.status == QueueStatus::Downloading)?;
            if item.progress_fraction == Some(fraction) {
                return None;
            }
            item.progress_fraction = Some(fraction);
            Some(())
        })
        .await
        .is_some()
    }

    // 仍然启用且待下载时才进入 Downloading
    async fn begin_item(&self, id: &str) -> Option<QueueItem> {
        self.mutate(|items| {
            let item = items.iter_mut().find(|i| i.id == id && i.is_runnable())?;
            item.status = QueueStatus::Downloading;
            item.progress_fraction = Some(0.0);
            item.error = None;
            Some(item.clone())
        })
        .await
    }

    pub async fn get_queue(&self) -> Vec<QueueItem> {
        self.inner.state.lock().await.items.clone()
    }

    pub async fn get_item(&self, id: &str) -> Option<QueueItem> {
        self.inner.state.lock().await.items.iter().find(|i| i.id == id).cloned()
    }

    pub async fn get_enabled_items(&self) -> Vec<QueueItem> {
        self.inner
            .state
            .lock()
            .await
            .items
            .iter()
            .filter(|i| i.is_runnable())
            .cloned()
            .collect()
    }

    pub async fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[QueueItem]) + Send + Sync + 'static,
    {
        let state = self.inner.state.lock().await;
        let _published = self.inner.publish_gate.lock().await;
        self.inner.observers.subscribe(&state.items, callback)
    }

    /// 运行所有启用且待下载的项。
    ///
    /// 单个项失败只记录在该项上，不影响其他项；所有项结束后才返回。
    pub async fn run(&self, mode: RunMode, executor: Arc<dyn QueueExecutor>) -> RunSummary {
        let selected: Vec<String> = self.get_enabled_items().await.into_iter().map(|i| i.id).collect();
        info!("开始运行下载队列: {} 项, 模式: {:?}", selected.len(), mode);

        let results: Vec<(String, ItemResult)> = match mode {
            RunMode::Sequential => {
                let mut results = Vec::with_capacity(selected.len());
                for id in selected {
                    let result = self.run_item(&id, Arc::clone(&executor)).await;
                    results.push((id, result));
                }
                results
            }
            RunMode::Parallel => {
                let runs = selected.iter().map(|id| {
                    let executor = Arc::clone(&executor);
                    async move { (id.clone(), self.run_item(id, executor).await) }
                });
                futures::future::join_all(runs).await
            }
        };

        let mut summary = RunSummary::default();
        for (id, result) in results {
            match result {
                ItemResult::Completed => summary.completed.push(id),
                ItemResult::Failed => summary.failed.push(id),
                ItemResult::Skipped => summary.skipped.push(id),
            }
        }
        info!(
            "下载队列运行结束: 完成 {}, 失败 {}, 跳过 {}",
            summary.completed.len(),
            summary.failed.len(),
            summary.skipped.len()
        );
        summary
    }

    async fn run_item(&self, id: &str, executor: Arc<dyn QueueExecutor>) -> ItemResult {
        let Some(item) = self.begin_item(id).await else {
            debug!("队列项已被禁用或移除，跳过: {}", id);
            return ItemResult::Skipped;
        };
        let display_name = item.display_name.clone();
        info!("开始下载队列项: {}", display_name);

        let reporter = ProgressReporter::new(self.clone(), id);
        // 单独的任务里执行，执行器 panic 也只影响这一项
        let handle = tokio::spawn(async move { executor.execute(&item, &reporter).await });
        let result = match handle.await {
            Ok(result) => result,
            Err(e) => Err(DownloadError::InvalidState(format!("执行器异常退出: {}", e))),
        };

        match result {
            Ok(path) => {
                info!("✅ 队列项完成: {} -> {}", display_name, path);
                self.update_item_status(id, QueueStatus::Completed, None, None).await;
                ItemResult::Completed
            }
            Err(e) => {
                error!("❌ 队列项失败: {}, 错误: {}", display_name, e);
                self.update_item_status(id, QueueStatus::Error, None, Some(e.to_string()))
                    .await;
                ItemResult::Failed
            }
        }
    }
}
