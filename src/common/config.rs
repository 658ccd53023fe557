use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::downloader::error::Result;
use crate::downloader::persistence::RetentionPolicy;
use crate::queue::models::RunMode;

const MIB: u64 = 1024 * 1024;

/// 下载引擎配置，可从 JSON 文件读取，缺失的字段使用默认值
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub state_dir: PathBuf,
    pub output_dir: PathBuf,
    pub retention: RetentionPolicy,
    pub placeholder_total_bytes: u64,
    pub group_file_estimate_bytes: u64,
    pub notification_dismiss_delay_ms: u64,
    pub queue_run_mode: RunMode,
    pub http_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from("./.launcher_state"),
            output_dir: PathBuf::from("./downloads"),
            retention: RetentionPolicy::default(),
            placeholder_total_bytes: 100 * MIB,
            group_file_estimate_bytes: 5 * MIB,
            notification_dismiss_delay_ms: 5000,
            queue_run_mode: RunMode::Sequential,
            http_timeout_secs: 300,
        }
    }
}

impl EngineConfig {
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&content)?;
        info!("已读取配置文件: {:?}", path);
        Ok(config)
    }
}
