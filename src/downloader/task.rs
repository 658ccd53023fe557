use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::progress;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Active,
    Paused,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// 分组进度的计量方式
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum GroupMeasure {
    // 成员字节数之和 / 成员总大小之和（同时启动的多文件下载）
    Bytes,
    // 已结束的成员数 / 成员总数（按顺序执行的实例安装批次）
    FileCount,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GroupInfo {
    pub members: Vec<String>,
    pub measure: GroupMeasure,
    // 批次的文件总数；逐个登记时 members 会少于它
    pub expected: usize,
    // 已结束（成功或失败）的成员数
    pub resolved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadTask {
    pub id: String,
    pub display_name: String,
    pub source_locator: String,
    pub status: TaskStatus,
    pub progress_fraction: f64,
    pub bytes_transferred: u64,
    pub bytes_total: u64,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub transfer_rate: u64,
    #[serde(default)]
    pub destination_path: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    // 旧数据没有归属，对所有档案可见
    #[serde(default)]
    pub owner_profile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupInfo>,
}

impl DownloadTask {
    pub fn new(
        source_locator: &str,
        display_name: &str,
        bytes_total: u64,
        owner_profile: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            display_name: display_name.to_string(),
            source_locator: source_locator.to_string(),
            status: TaskStatus::Pending,
            progress_fraction: 0.0,
            bytes_transferred: 0,
            bytes_total,
            started_at: now,
            completed_at: None,
            transfer_rate: 0,
            destination_path: None,
            error_message: None,
            owner_profile,
            group: None,
        }
    }

    /// 分组记录没有自己的下载地址，进度完全由成员推导
    pub fn new_group(
        display_name: &str,
        bytes_total: u64,
        measure: GroupMeasure,
        expected: usize,
        owner_profile: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut task = Self::new("", display_name, bytes_total, owner_profile, now);
        task.status = TaskStatus::Active;
        task.group = Some(GroupInfo {
            members: Vec::new(),
            measure,
            expected,
            resolved: 0,
        });
        task
    }

    pub fn is_group(&self) -> bool {
        self.group.is_some()
    }

    pub fn percent(&self) -> u8 {
        progress::percent(self.progress_fraction)
    }

    // 进入下载中状态；从终态重新开始时清空进度
    pub fn begin(&mut self, now: DateTime<Utc>) -> bool {
        match self.status {
            TaskStatus::Active => false,
            TaskStatus::Pending | TaskStatus::Paused => {
                self.status = TaskStatus::Active;
                true
            }
            TaskStatus::Completed | TaskStatus::Failed => {
                self.progress_fraction = 0.0;
                self.bytes_transferred = 0;
                self.transfer_rate = 0;
                self.started_at = now;
                self.completed_at = None;
                self.destination_path = None;
                self.error_message = None;
                self.status = TaskStatus::Active;
                true
            }
        }
    }

    pub fn pause(&mut self) -> bool {
        if self.status != TaskStatus::Active {
            return false;
        }
        self.status = TaskStatus::Paused;
        true
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> bool {
        self.fail("下载已取消", now)
    }

    pub fn complete(&mut self, final_path: &str, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Completed;
        self.progress_fraction = 1.0;
        if self.bytes_total > 0 {
            self.bytes_transferred = self.bytes_total;
        }
        self.completed_at = Some(now);
        self.destination_path = Some(final_path.to_string());
        true
    }

    pub fn fail(&mut self, message: &str, now: DateTime<Utc>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = TaskStatus::Failed;
        self.completed_at = Some(now);
        self.error_message = Some(message.to_string());
        true
    }

    pub fn visible_to(&self, profile: Option<&str>) -> bool {
        match &self.owner_profile {
            None => true,
            Some(owner) => Some(owner.as_str()) == profile,
        }
    }
}
