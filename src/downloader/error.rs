use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP错误: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("任务未找到: {0}")]
    TaskNotFound(String),

    #[error("无效的状态: {0}")]
    InvalidState(String),

    #[error("传输失败: {0}")]
    Transport(String),

    // 面向用户的校验信息，不做任何替换
    #[error("没有找到兼容的文件: {content_id} (版本 {version})")]
    NoCompatibleFile { content_id: String, version: String },

    #[error("持久化失败: {0}")]
    Persistence(String),

    #[error("任务已被移除: {0}")]
    TaskRemoved(String),
}

pub type Result<T> = std::result::Result<T, DownloadError>;
