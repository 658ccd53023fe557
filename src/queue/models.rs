use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Mod,
    ResourcePack,
    Shader,
    DataPack,
    Modpack,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QueueStatus {
    Pending,
    Downloading,
    Completed,
    Error,
    // 旧快照里的禁用状态；现在禁用只改 enabled
    Disabled,
}

impl QueueStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, QueueStatus::Completed | QueueStatus::Error)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Sequential,
    Parallel,
}

/// 加入队列时由界面提供的信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueueItemRequest {
    pub original_content_id: String,
    pub display_name: String,
    pub version: String,
    #[serde(default)]
    pub loader: Option<String>,
    pub destination_path: String,
    pub platform_tag: String,
    #[serde(default)]
    pub content_kind: Option<ContentKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueItem {
    pub id: String,
    // 目录里的内容 id，用来重新查询兼容版本
    pub original_content_id: String,
    pub display_name: String,
    pub version: String,
    #[serde(default)]
    pub loader: Option<String>,
    pub destination_path: String,
    pub platform_tag: String,
    #[serde(default)]
    pub content_kind: Option<ContentKind>,
    pub enabled: bool,
    pub status: QueueStatus,
    // 仅在 Downloading 时存在
    #[serde(default)]
    pub progress_fraction: Option<f64>,
    #[serde(default)]
    pub error: Option<String>,
}

impl QueueItem {
    pub fn from_request(id: String, request: QueueItemRequest) -> Self {
        Self {
            id,
            original_content_id: request.original_content_id,
            display_name: request.display_name,
            version: request.version,
            loader: request.loader,
            destination_path: request.destination_path,
            platform_tag: request.platform_tag,
            content_kind: request.content_kind,
            enabled: true,
            status: QueueStatus::Pending,
            progress_fraction: None,
            error: None,
        }
    }

    pub fn is_runnable(&self) -> bool {
        self.enabled && self.status == QueueStatus::Pending
    }
}

/// 一次队列运行的汇总
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    // 运行期间被禁用或移除而跳过的项
    pub skipped: Vec<String>,
}
