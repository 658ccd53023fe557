#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use launcher_downloader::downloader::error::{DownloadError, Result};
use launcher_downloader::downloader::notify::{Notification, Notifier};
use launcher_downloader::downloader::persistence::{MemoryStore, SnapshotStore};
use launcher_downloader::downloader::profile::ActiveProfile;
use launcher_downloader::downloader::transport::{
    EventSender, TransferRequest, Transport, TransportEvent, event_channel,
};
use launcher_downloader::downloader::{Collaborators, DownloadManager, ManagerSettings};

/// 只记录请求，事件由测试自己发送
#[derive(Default)]
pub struct RecordingTransport {
    pub requests: Mutex<Vec<TransferRequest>>,
}

impl RecordingTransport {
    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for RecordingTransport {
    fn start(&self, request: TransferRequest) {
        self.requests.lock().unwrap().push(request);
    }
}

/// 立即回放事件：先报告一半进度，再完成或失败
pub struct ScriptedTransport {
    events: EventSender,
    failing: Vec<String>,
    pub requests: Mutex<Vec<TransferRequest>>,
}

impl ScriptedTransport {
    pub fn new(events: EventSender, failing: &[&str]) -> Self {
        Self {
            events,
            failing: failing.iter().map(|s| s.to_string()).collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Transport for ScriptedTransport {
    fn start(&self, request: TransferRequest) {
        let task_id = request.task_id.clone();
        let _ = self.events.send(TransportEvent::Length {
            task_id: task_id.clone(),
            total_bytes: 2048,
        });
        let _ = self.events.send(TransportEvent::Progress {
            task_id: task_id.clone(),
            fraction: 0.5,
        });
        let last = if self.failing.contains(&request.source) {
            TransportEvent::Error {
                task_id,
                message: format!("连接被重置: {}", request.source),
            }
        } else {
            TransportEvent::Complete {
                task_id,
                path: format!("/downloads/{}", request.filename),
            }
        };
        let _ = self.events.send(last);
        self.requests.lock().unwrap().push(request);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NoticeCall {
    Show(Notification),
    Update { id: String, percent: u8 },
    Dismiss(String),
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub calls: Mutex<Vec<NoticeCall>>,
    counter: Mutex<u32>,
}

impl RecordingNotifier {
    pub fn calls(&self) -> Vec<NoticeCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn shown(&self) -> Vec<Notification> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                NoticeCall::Show(n) => Some(n),
                _ => None,
            })
            .collect()
    }

    pub fn updates(&self) -> Vec<u8> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                NoticeCall::Update { percent, .. } => Some(percent),
                _ => None,
            })
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn show(&self, notification: Notification) -> String {
        let mut counter = self.counter.lock().unwrap();
        *counter += 1;
        self.calls.lock().unwrap().push(NoticeCall::Show(notification));
        format!("notice-{}", *counter)
    }

    fn update_progress(&self, notification_id: &str, percent: u8, _message: &str) {
        self.calls.lock().unwrap().push(NoticeCall::Update {
            id: notification_id.to_string(),
            percent,
        });
    }

    fn dismiss(&self, notification_id: &str) {
        self.calls
            .lock()
            .unwrap()
            .push(NoticeCall::Dismiss(notification_id.to_string()));
    }
}

/// 读写都失败的存储
pub struct FailingStore;

#[async_trait]
impl SnapshotStore for FailingStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        Err(DownloadError::Persistence(format!("磁盘不可用: {}", key)))
    }

    async fn save(&self, key: &str, _blob: &str) -> Result<()> {
        Err(DownloadError::Persistence(format!("磁盘不可用: {}", key)))
    }
}

pub fn test_settings() -> ManagerSettings {
    ManagerSettings {
        placeholder_total_bytes: 1000,
        group_file_estimate_bytes: 100,
        dismiss_delay: Duration::from_millis(20),
        ..ManagerSettings::default()
    }
}

pub fn collaborators(
    transport: Arc<dyn Transport>,
    store: Arc<dyn SnapshotStore>,
    notifier: Arc<dyn Notifier>,
    profile: Arc<ActiveProfile>,
) -> Collaborators {
    Collaborators {
        transport,
        store,
        notifier,
        profile,
    }
}

/// 手动驱动的管理器：测试直接调用 on_progress/on_complete
pub struct Manual {
    pub manager: DownloadManager,
    pub transport: Arc<RecordingTransport>,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub profile: Arc<ActiveProfile>,
}

pub fn manual(profile: Option<&str>) -> Manual {
    let transport = Arc::new(RecordingTransport::default());
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let profile = Arc::new(ActiveProfile::new(profile));
    let manager = DownloadManager::new(
        test_settings(),
        collaborators(transport.clone(), store.clone(), notifier.clone(), profile.clone()),
    );
    Manual {
        manager,
        transport,
        store,
        notifier,
        profile,
    }
}

/// 事件泵驱动的管理器，传输按脚本立即回放
pub struct Scripted {
    pub manager: DownloadManager,
    pub transport: Arc<ScriptedTransport>,
    pub store: Arc<MemoryStore>,
}

pub fn scripted(failing: &[&str]) -> Scripted {
    let (events, receiver) = event_channel();
    let transport = Arc::new(ScriptedTransport::new(events, failing));
    let store = Arc::new(MemoryStore::new());
    let manager = DownloadManager::new(
        test_settings(),
        collaborators(
            transport.clone(),
            store.clone(),
            Arc::new(RecordingNotifier::default()),
            Arc::new(ActiveProfile::new(None)),
        ),
    );
    manager.spawn_event_pump(receiver);
    Scripted {
        manager,
        transport,
        store,
    }
}

/// 轮询等待条件成立，最多等一秒
pub async fn wait_until<F: FnMut() -> bool>(mut condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("等待超时");
}
