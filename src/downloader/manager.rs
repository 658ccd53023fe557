use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use itertools::Itertools;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::DownloadError;
use super::models::{InstallFile, TaskOutcome, sanitize_filename};
use super::notify::{Notification, Notifier};
use super::observer::{ObserverBus, Subscription};
use super::persistence::{self, DOWNLOADS_KEY, RetentionPolicy, SnapshotStore};
use super::profile::ProfileProvider;
use super::progress;
use super::task::{DownloadTask, GroupMeasure, TaskStatus};
use super::transport::{EventReceiver, TransferRequest, Transport, TransportEvent};
use crate::common::config::EngineConfig;

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    // 传输层报告真实大小之前使用的占位值
    pub placeholder_total_bytes: u64,
    pub group_file_estimate_bytes: u64,
    pub dismiss_delay: Duration,
    pub retention: RetentionPolicy,
}

impl Default for ManagerSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ManagerSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            placeholder_total_bytes: config.placeholder_total_bytes,
            group_file_estimate_bytes: config.group_file_estimate_bytes,
            dismiss_delay: Duration::from_millis(config.notification_dismiss_delay_ms),
            retention: config.retention,
        }
    }
}

/// 下载管理器依赖的外部组件
pub struct Collaborators {
    pub transport: Arc<dyn Transport>,
    pub store: Arc<dyn SnapshotStore>,
    pub notifier: Arc<dyn Notifier>,
    pub profile: Arc<dyn ProfileProvider>,
}

/// 需要等待结果的下载（分组成员、队列项）
#[derive(Debug, Clone)]
pub struct TrackedRequest {
    pub source: String,
    pub filename: String,
    pub display_name: String,
    pub bytes_estimate: u64,
    pub owner_profile: Option<String>,
    pub group_id: Option<String>,
}

/// 订阅单个任务的状态变化
pub struct TaskWatch {
    task_id: String,
    rx: watch::Receiver<DownloadTask>,
}

impl TaskWatch {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    // 等待下一次变化；任务被移除或已结束后返回 None
    pub async fn next(&mut self) -> Option<DownloadTask> {
        if self.rx.changed().await.is_err() {
            return None;
        }
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn outcome(&self) -> TaskOutcome {
        let outcome = TaskOutcome::from_task(&self.rx.borrow());
        outcome.unwrap_or_else(|| TaskOutcome::Failed {
            message: DownloadError::TaskRemoved(self.task_id.clone()).to_string(),
        })
    }

    /// 一直等到任务进入终态。传输层不回报时会一直等待。
    pub async fn wait_terminal(mut self) -> TaskOutcome {
        loop {
            let outcome = TaskOutcome::from_task(&self.rx.borrow_and_update());
            if let Some(outcome) = outcome {
                return outcome;
            }
            if self.rx.changed().await.is_err() {
                return self.outcome();
            }
        }
    }
}

struct ProgressNotice {
    notification_id: String,
    last_percent: u8,
}

#[derive(Default)]
struct Change {
    touched: Vec<String>,
    removed: Vec<String>,
}

impl Change {
    fn is_empty(&self) -> bool {
        self.touched.is_empty() && self.removed.is_empty()
    }

    fn touch(&mut self, id: &str) {
        if !self.touched.iter().any(|t| t == id) {
            self.touched.push(id.to_string());
        }
    }
}

struct Commit {
    version: u64,
    all: Vec<DownloadTask>,
    touched: Vec<DownloadTask>,
    removed: Vec<String>,
}

#[derive(Default)]
struct TaskTable {
    tasks: HashMap<String, DownloadTask>,
    // 成员 id -> 分组 id
    group_of: HashMap<String, String>,
    version: u64,
}

impl TaskTable {
    fn from_tasks(tasks: Vec<DownloadTask>) -> Self {
        let mut table = Self::default();
        for task in tasks {
            if let Some(info) = &task.group {
                for member in &info.members {
                    table.group_of.insert(member.clone(), task.id.clone());
                }
            }
            table.tasks.insert(task.id.clone(), task);
        }
        table
    }

    fn commit(&mut self, change: Change) -> Commit {
        self.version += 1;
        Commit {
            version: self.version,
            all: self.tasks.values().cloned().collect(),
            touched: change
                .touched
                .iter()
                .filter_map(|id| self.tasks.get(id).cloned())
                .collect(),
            removed: change.removed,
        }
    }

    fn refresh_group_of(&mut self, member_id: &str, now: DateTime<Utc>) -> Option<String> {
        let group_id = self.group_of.get(member_id)?.clone();
        self.refresh_group(&group_id, now)
    }

    // 成员变化之后再重新计算分组
    fn refresh_group(&mut self, group_id: &str, now: DateTime<Utc>) -> Option<String> {
        let member_ids = self.tasks.get(group_id)?.group.as_ref()?.members.clone();
        let members: Vec<Option<DownloadTask>> =
            member_ids.iter().map(|id| self.tasks.get(id).cloned()).collect();
        let members: Vec<Option<&DownloadTask>> = members.iter().map(Option::as_ref).collect();

        let group = self.tasks.get_mut(group_id)?;
        progress::aggregate_group(group, &members, now);
        if progress::group_settled(group) && !group.status.is_terminal() {
            finish_group(group, now);
            info!("✅ 分组下载完成: {}", group.display_name);
        }
        Some(group_id.to_string())
    }
}

// 分组只统计结束的成员数，不会整体失败
fn finish_group(group: &mut DownloadTask, now: DateTime<Utc>) {
    group.status = TaskStatus::Completed;
    group.progress_fraction = 1.0;
    group.completed_at = Some(now);
}

struct Inner {
    table: Mutex<TaskTable>,
    transport: Arc<dyn Transport>,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    profile: Arc<dyn ProfileProvider>,
    observers: ObserverBus<DownloadTask>,
    watchers: DashMap<String, watch::Sender<DownloadTask>>,
    notices: DashMap<String, ProgressNotice>,
    // 发布锁：持有表锁时获取，保证按版本顺序发布
    publish_gate: Mutex<u64>,
    settings: ManagerSettings,
}

/// 下载任务的存储与生命周期管理。
///
/// 所有修改都在同一把锁内完成。提交后先拿到发布锁再释放表锁，
/// 持久化和通知按提交顺序进行，订阅者最后看到的总是最新列表。
#[derive(Clone)]
pub struct DownloadManager {
    inner: Arc<Inner>,
}

impl DownloadManager {
    pub fn new(settings: ManagerSettings, deps: Collaborators) -> Self {
        Self::with_table(settings, deps, TaskTable::default())
    }

    /// 读取历史记录并执行一次保留期清理
    pub async fn load(settings: ManagerSettings, deps: Collaborators) -> Self {
        let records: Vec<DownloadTask> = persistence::load_records(deps.store.as_ref(), DOWNLOADS_KEY).await;
        let (kept, purged) = settings.retention.sweep(records, Utc::now());
        info!("载入 {} 条下载记录", kept.len());

        if purged > 0 {
            if let Err(e) = persistence::save_records(deps.store.as_ref(), DOWNLOADS_KEY, &kept).await {
                warn!("写回清理后的下载记录失败: {}", e);
            }
        }
        Self::with_table(settings, deps, TaskTable::from_tasks(kept))
    }

    fn with_table(settings: ManagerSettings, deps: Collaborators, table: TaskTable) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: Mutex::new(table),
                transport: deps.transport,
                store: deps.store,
                notifier: deps.notifier,
                profile: deps.profile,
                observers: ObserverBus::new(),
                watchers: DashMap::new(),
                notices: DashMap::new(),
                publish_gate: Mutex::new(0),
                settings,
            }),
        }
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.inner.settings
    }

    /// 在单独的任务里串行处理传输事件
    pub fn spawn_event_pump(&self, mut events: EventReceiver) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                manager.handle_event(event).await;
            }
            debug!("传输事件通道已关闭");
        })
    }

    pub async fn handle_event(&self, event: TransportEvent) {
        match event {
            TransportEvent::Length { task_id, total_bytes } => self.on_length(&task_id, total_bytes).await,
            TransportEvent::Progress { task_id, fraction } => self.on_progress(&task_id, fraction).await,
            TransportEvent::Complete { task_id, path } => self.on_complete(&task_id, &path).await,
            TransportEvent::Error { task_id, message } => self.on_error(&task_id, &message).await,
        }
    }

    // 有变更（touched/removed 非空）时才提交、持久化和通知
    async fn apply<R>(&self, f: impl FnOnce(&mut TaskTable, DateTime<Utc>, &mut Change) -> R) -> R {
        let now = Utc::now();
        let (result, pending) = {
            let mut table = self.inner.table.lock().await;
            let mut change = Change::default();
            let result = f(&mut table, now, &mut change);
            let pending = match (!change.is_empty()).then(|| table.commit(change)) {
                // 释放表锁之前排队拿发布锁，后提交的一定后发布
                Some(commit) => Some((commit, self.inner.publish_gate.lock().await)),
                None => None,
            };
            (result, pending)
        };
        if let Some((commit, mut published)) = pending {
            self.publish(commit, &mut published).await;
        }
        result
    }

    // 调用方持有发布锁；published 为上一次发布的版本
    async fn publish(&self, commit: Commit, published: &mut u64) {
        if commit.version <= *published {
            debug!("跳过过期的变更: {} <= {}", commit.version, published);
            return;
        }
        *published = commit.version;

        for task in &commit.touched {
            if let Some(sender) = self.inner.watchers.get(&task.id) {
                sender.send_replace(task.clone());
            }
            if task.status.is_terminal() {
                self.inner.watchers.remove(&task.id);
            }
        }
        for id in &commit.removed {
            self.inner.watchers.remove(id);
            self.inner.notices.remove(id);
        }

        self.persist(&commit.all).await;
        let visible = self.visible(commit.all);
        self.inner.observers.publish(&visible);
    }

    async fn persist(&self, all: &[DownloadTask]) {
        let all: Vec<&DownloadTask> = all.iter().sorted_by_key(|t| t.started_at).collect();
        if let Err(e) = persistence::save_records(self.inner.store.as_ref(), DOWNLOADS_KEY, &all).await {
            warn!("保存下载记录失败，仅保留内存状态: {}", e);
        }
    }

    fn visible(&self, tasks: Vec<DownloadTask>) -> Vec<DownloadTask> {
        let profile = self.inner.profile.current_profile();
        tasks
            .into_iter()
            .filter(|t| t.visible_to(profile.as_deref()))
            .sorted_by(|a, b| b.started_at.cmp(&a.started_at))
            .collect()
    }

    // ------------------------------------------------------------------
    // 生命周期

    /// 创建单个下载任务并立即开始传输
    pub async fn create(&self, source: &str, display_name: &str, owner_profile: Option<String>) -> DownloadTask {
        let placeholder = self.inner.settings.placeholder_total_bytes;
        let task = self
            .apply(|table, now, change| {
                let task = DownloadTask::new(source, display_name, placeholder, owner_profile, now);
                change.touch(&task.id);
                table.tasks.insert(task.id.clone(), task.clone());
                task
            })
            .await;
        info!("添加下载任务: {} ({})", task.display_name, task.id);

        match self.start(&task.id).await {
            Some(started) => started,
            None => task,
        }
    }

    /// Pending/Paused/Completed/Failed -> Active，并交给传输层
    pub async fn start(&self, task_id: &str) -> Option<DownloadTask> {
        let started = self
            .apply(|table, now, change| {
                let task = table.tasks.get_mut(task_id)?;
                if task.is_group() || !task.begin(now) {
                    return None;
                }
                change.touch(task_id);
                if let Some(group_id) = table.refresh_group_of(task_id, now) {
                    change.touch(&group_id);
                }
                table.tasks.get(task_id).cloned()
            })
            .await;

        let Some(task) = started else {
            debug!("忽略开始请求: {}", task_id);
            return None;
        };
        self.inner.transport.start(TransferRequest {
            task_id: task.id.clone(),
            source: task.source_locator.clone(),
            filename: sanitize_filename(&task.display_name),
        });
        Some(task)
    }

    // 传输层没有真正的暂停，这里只是界面上的标记
    pub async fn pause(&self, task_id: &str) -> bool {
        self.apply(|table, _, change| {
            let task = table.tasks.get_mut(task_id)?;
            if !task.pause() {
                return None;
            }
            change.touch(task_id);
            Some(())
        })
        .await
        .is_some()
    }

    pub async fn resume(&self, task_id: &str) -> Option<DownloadTask> {
        let paused = {
            let table = self.inner.table.lock().await;
            table.tasks.get(task_id).is_some_and(|t| t.status == TaskStatus::Paused)
        };
        if !paused {
            return None;
        }
        self.start(task_id).await
    }

    /// 非终态 -> Failed。取消分组等于取消它所有未结束的成员。
    pub async fn cancel(&self, task_id: &str) -> bool {
        self.apply(|table, now, change| {
            let task = table.tasks.get(task_id)?;
            let (members, group_id) = match &task.group {
                Some(info) => (info.members.clone(), Some(task_id.to_string())),
                None => (vec![task_id.to_string()], table.group_of.get(task_id).cloned()),
            };

            for member in &members {
                if let Some(task) = table.tasks.get_mut(member) {
                    if task.cancel(now) {
                        change.touch(member);
                    }
                }
            }
            if change.is_empty() {
                return None;
            }
            info!("取消下载: {}", task_id);
            if let Some(group_id) = group_id {
                if table.refresh_group(&group_id, now).is_some() {
                    change.touch(&group_id);
                }
            }
            Some(())
        })
        .await
        .is_some()
    }

    /// 从历史中删除，不检查状态
    pub async fn remove(&self, task_id: &str) -> bool {
        self.apply(|table, now, change| {
            let task = table.tasks.remove(task_id)?;
            change.removed.push(task_id.to_string());
            if let Some(info) = &task.group {
                for member in &info.members {
                    table.group_of.remove(member);
                }
            }
            if let Some(group_id) = table.refresh_group_of(task_id, now) {
                change.touch(&group_id);
            }
            table.group_of.remove(task_id);
            Some(())
        })
        .await
        .is_some()
    }

    /// 删除所有已完成任务。档案过滤只作用于读取，这里不过滤。
    pub async fn clear_completed(&self) -> usize {
        self.apply(|table, _, change| {
            let ids: Vec<String> = table
                .tasks
                .values()
                .filter(|t| t.status == TaskStatus::Completed)
                .map(|t| t.id.clone())
                .collect();
            if ids.is_empty() {
                return None;
            }
            for id in &ids {
                if let Some(task) = table.tasks.remove(id) {
                    if let Some(info) = &task.group {
                        for member in &info.members {
                            table.group_of.remove(member);
                        }
                    }
                }
                table.group_of.remove(id);
                change.removed.push(id.clone());
            }
            Some(ids.len())
        })
        .await
        .unwrap_or(0)
    }

    // ------------------------------------------------------------------
    // 分组

    /// 创建分组记录。成员数为 0 时直接完成。
    pub async fn open_group(
        &self,
        display_name: &str,
        measure: GroupMeasure,
        expected: usize,
        owner_profile: Option<String>,
    ) -> DownloadTask {
        let estimate = self.inner.settings.group_file_estimate_bytes;
        self.apply(|table, now, change| {
            let mut group = DownloadTask::new_group(
                display_name,
                expected as u64 * estimate,
                measure,
                expected,
                owner_profile,
                now,
            );
            if expected == 0 {
                finish_group(&mut group, now);
            }
            change.touch(&group.id);
            table.tasks.insert(group.id.clone(), group.clone());
            group
        })
        .await
    }

    /// 同时启动所有文件，按字节汇总进度
    pub async fn create_group(
        &self,
        display_name: &str,
        files: &[InstallFile],
        owner_profile: Option<String>,
    ) -> DownloadTask {
        let group = self
            .open_group(display_name, GroupMeasure::Bytes, files.len(), owner_profile.clone())
            .await;
        let estimate = self.inner.settings.group_file_estimate_bytes;
        for file in files {
            self.start_tracked(TrackedRequest {
                source: file.url.clone(),
                filename: file.filename.clone(),
                display_name: file.display_name.clone(),
                bytes_estimate: estimate,
                owner_profile: owner_profile.clone(),
                group_id: Some(group.id.clone()),
            })
            .await;
        }
        self.get_download(&group.id).await.unwrap_or(group)
    }

    /// 重新计算分组，全部成员结束时标记完成
    pub async fn settle_group(&self, group_id: &str) -> Option<DownloadTask> {
        self.apply(|table, now, change| {
            table.refresh_group(group_id, now)?;
            change.touch(group_id);
            table.tasks.get(group_id).cloned()
        })
        .await
    }

    /// 创建任务、登记分组成员、开始传输，并返回可等待结果的句柄
    pub async fn start_tracked(&self, request: TrackedRequest) -> TaskWatch {
        let (task, rx) = self
            .apply(|table, now, change| {
                let mut task = DownloadTask::new(
                    &request.source,
                    &request.display_name,
                    request.bytes_estimate,
                    request.owner_profile.clone(),
                    now,
                );
                task.begin(now);
                let task_id = task.id.clone();
                table.tasks.insert(task_id.clone(), task.clone());
                change.touch(&task_id);

                if let Some(group_id) = &request.group_id {
                    let registered = table
                        .tasks
                        .get_mut(group_id)
                        .and_then(|g| g.group.as_mut())
                        .map(|info| info.members.push(task_id.clone()))
                        .is_some();
                    if registered {
                        table.group_of.insert(task_id.clone(), group_id.clone());
                        table.refresh_group(group_id, now);
                        change.touch(group_id);
                    } else {
                        warn!("分组不存在，成员单独下载: {}", group_id);
                    }
                }

                // 先登记观察者再开始传输，不会漏掉事件
                let (tx, rx) = watch::channel(task.clone());
                self.inner.watchers.insert(task_id, tx);
                (task, rx)
            })
            .await;

        debug!("开始跟踪下载: {} ({})", task.display_name, task.id);
        self.inner.transport.start(TransferRequest {
            task_id: task.id.clone(),
            source: task.source_locator.clone(),
            filename: request.filename,
        });
        TaskWatch {
            task_id: task.id,
            rx,
        }
    }

    /// 观察已有任务；终态任务返回的句柄会立即给出结果
    pub async fn watch(&self, task_id: &str) -> Option<TaskWatch> {
        let table = self.inner.table.lock().await;
        let task = table.tasks.get(task_id)?.clone();
        // 等正在进行的发布结束，避免旧状态覆盖新建的通道
        let _published = self.inner.publish_gate.lock().await;
        let rx = if task.status.is_terminal() {
            watch::channel(task).1
        } else {
            self.inner
                .watchers
                .entry(task_id.to_string())
                .or_insert_with(|| watch::channel(task).0)
                .subscribe()
        };
        Some(TaskWatch {
            task_id: task_id.to_string(),
            rx,
        })
    }

    // ------------------------------------------------------------------
    // 传输事件

    pub async fn on_length(&self, task_id: &str, total_bytes: u64) {
        let applied = self
            .apply(|table, now, change| {
                let task = table.tasks.get_mut(task_id)?;
                if task.status.is_terminal() || total_bytes == 0 {
                    return None;
                }
                progress::apply_length(task, total_bytes);
                change.touch(task_id);
                if let Some(group_id) = table.refresh_group_of(task_id, now) {
                    change.touch(&group_id);
                }
                Some(())
            })
            .await;
        if applied.is_none() {
            debug!("忽略大小事件: {}", task_id);
        }
    }

    pub async fn on_progress(&self, task_id: &str, fraction: f64) {
        let notice = self
            .apply(|table, now, change| {
                let task = table.tasks.get_mut(task_id)?;
                if !progress::apply_fraction(task, fraction, now) {
                    return None;
                }
                change.touch(task_id);
                let group_id = table.refresh_group_of(task_id, now);
                if let Some(group_id) = &group_id {
                    change.touch(group_id);
                }
                // 成员的进度以分组为单位转发
                let key = group_id.unwrap_or_else(|| task_id.to_string());
                table.tasks.get(&key).cloned()
            })
            .await;

        match notice {
            Some(task) => self.forward_progress(&task),
            None => debug!("忽略进度事件: {}", task_id),
        }
    }

    pub async fn on_complete(&self, task_id: &str, path: &str) {
        let done = self
            .apply(|table, now, change| {
                let task = table.tasks.get_mut(task_id)?;
                if !task.complete(path, now) {
                    return None;
                }
                change.touch(task_id);
                let group = table.refresh_group_of(task_id, now).and_then(|id| {
                    change.touch(&id);
                    table.tasks.get(&id).cloned()
                });
                Some((table.tasks.get(task_id).cloned()?, group))
            })
            .await;

        let Some((task, group)) = done else {
            debug!("忽略完成事件: {}", task_id);
            return;
        };
        info!("✅ 下载任务完成: {} -> {}", task.display_name, path);

        match group {
            Some(group) => {
                self.forward_progress(&group);
                if group.status == TaskStatus::Completed {
                    self.finish_notice(&group, Notification::success(&group.display_name, "下载完成"));
                }
            }
            None => self.finish_notice(&task, Notification::success(&task.display_name, "下载完成")),
        }
    }

    pub async fn on_error(&self, task_id: &str, message: &str) {
        let failed = self
            .apply(|table, now, change| {
                let task = table.tasks.get_mut(task_id)?;
                if !task.fail(message, now) {
                    return None;
                }
                change.touch(task_id);
                let group = table.refresh_group_of(task_id, now).and_then(|id| {
                    change.touch(&id);
                    table.tasks.get(&id).cloned()
                });
                Some((table.tasks.get(task_id).cloned()?, group))
            })
            .await;

        let Some((task, group)) = failed else {
            debug!("忽略错误事件: {}", task_id);
            return;
        };
        error!("❌ 下载任务失败: {}, 错误: {}", task.display_name, message);

        self.finish_notice(&task, Notification::error(&task.display_name, message));
        if let Some(group) = group {
            self.forward_progress(&group);
            if group.status == TaskStatus::Completed {
                self.finish_notice(&group, Notification::success(&group.display_name, "下载完成"));
            }
        }
    }

    // ------------------------------------------------------------------
    // 通知

    // 百分比变化时才转发，避免刷屏
    fn forward_progress(&self, task: &DownloadTask) {
        let percent = task.percent();
        let message = format!("{}%", percent);
        match self.inner.notices.entry(task.id.clone()) {
            Entry::Occupied(mut entry) => {
                let notice = entry.get_mut();
                if notice.last_percent != percent {
                    notice.last_percent = percent;
                    self.inner
                        .notifier
                        .update_progress(&notice.notification_id, percent, &message);
                }
            }
            Entry::Vacant(entry) => {
                let mut notification = Notification::progress(&task.display_name, &message);
                notification.progress = Some(percent);
                let notification_id = self.inner.notifier.show(notification);
                entry.insert(ProgressNotice {
                    notification_id,
                    last_percent: percent,
                });
            }
        }
    }

    fn finish_notice(&self, task: &DownloadTask, notification: Notification) {
        if let Some((_, notice)) = self.inner.notices.remove(&task.id) {
            self.inner
                .notifier
                .update_progress(&notice.notification_id, task.percent(), &notification.message);
            self.schedule_dismiss(notice.notification_id);
        }
        self.inner.notifier.show(notification);
    }

    fn schedule_dismiss(&self, notification_id: String) {
        let notifier = Arc::clone(&self.inner.notifier);
        let delay = self.inner.settings.dismiss_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            notifier.dismiss(&notification_id);
        });
    }

    // ------------------------------------------------------------------
    // 读取（按档案过滤）

    pub async fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[DownloadTask]) + Send + Sync + 'static,
    {
        // 同时持有表锁和发布锁：不会错过之后的变更，也不会再收到更旧的列表
        let table = self.inner.table.lock().await;
        let _published = self.inner.publish_gate.lock().await;
        let current = self.visible(table.tasks.values().cloned().collect());
        self.inner.observers.subscribe(&current, callback)
    }

    /// 按 id 查询，不做档案过滤
    pub async fn get_download(&self, task_id: &str) -> Option<DownloadTask> {
        self.inner.table.lock().await.tasks.get(task_id).cloned()
    }

    /// 所有档案的全部记录，最新的在前
    pub async fn snapshot(&self) -> Vec<DownloadTask> {
        let table = self.inner.table.lock().await;
        table
            .tasks
            .values()
            .cloned()
            .sorted_by(|a, b| b.started_at.cmp(&a.started_at))
            .collect()
    }

    pub async fn get_all_downloads(&self) -> Vec<DownloadTask> {
        let all = self.inner.table.lock().await.tasks.values().cloned().collect();
        self.visible(all)
    }

    pub async fn get_active_downloads(&self) -> Vec<DownloadTask> {
        self.get_all_downloads()
            .await
            .into_iter()
            .filter(|t| matches!(t.status, TaskStatus::Active | TaskStatus::Paused))
            .collect()
    }

    pub async fn get_completed_downloads(&self) -> Vec<DownloadTask> {
        self.get_all_downloads()
            .await
            .into_iter()
            .filter(|t| t.status == TaskStatus::Completed)
            .sorted_by(|a, b| b.completed_at.cmp(&a.completed_at))
            .collect()
    }
}
