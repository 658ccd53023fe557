use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::task::{DownloadTask, TaskStatus};

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("静态正则");
}

/// 批量安装中的一个文件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstallFile {
    pub url: String,
    pub filename: String,
    pub display_name: String,
}

impl InstallFile {
    pub fn new(url: &str, filename: &str, display_name: &str) -> Self {
        Self {
            url: url.to_string(),
            filename: filename.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

// 任务结束时的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed { path: String },
    Failed { message: String },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Completed { .. })
    }

    pub(crate) fn from_task(task: &DownloadTask) -> Option<Self> {
        match task.status {
            TaskStatus::Completed => Some(TaskOutcome::Completed {
                path: task.destination_path.clone().unwrap_or_default(),
            }),
            TaskStatus::Failed => Some(TaskOutcome::Failed {
                message: task
                    .error_message
                    .clone()
                    .unwrap_or_else(|| "下载失败".to_string()),
            }),
            _ => None,
        }
    }
}

/// 显示名转文件名：连续空白替换成下划线
pub fn sanitize_filename(display_name: &str) -> String {
    WHITESPACE.replace_all(display_name.trim(), "_").into_owned()
}

/// 链接路径的最后一段，作为默认文件名
pub fn filename_from_url(source: &str) -> Option<String> {
    let url = url::Url::parse(source).ok()?;
    url.path_segments()?
        .next_back()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
