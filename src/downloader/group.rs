use tracing::{info, warn};

use super::manager::{DownloadManager, TrackedRequest};
use super::models::{InstallFile, TaskOutcome};
use super::task::GroupMeasure;

/// 一次批量安装的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub group_id: String,
    pub completed: Vec<String>,
    // (显示名, 错误信息)
    pub failed: Vec<(String, String)>,
}

impl InstallReport {
    pub fn processed(&self) -> usize {
        self.completed.len() + self.failed.len()
    }
}

/// 实例安装：一个分组 + 逐个下载的成员
#[derive(Clone)]
pub struct GroupOrchestrator {
    downloads: DownloadManager,
}

impl GroupOrchestrator {
    pub fn new(downloads: DownloadManager) -> Self {
        Self { downloads }
    }

    /// 严格按顺序下载，等上一个文件结束（成功或失败）再开始下一个。
    ///
    /// 分组进度按已结束的文件数计算，某个文件失败不会中止整个批次。
    pub async fn install_instance(
        &self,
        instance_name: &str,
        files: &[InstallFile],
        owner_profile: Option<String>,
    ) -> InstallReport {
        let title = format!("安装 {} - {} 个文件", instance_name, files.len());
        let group = self
            .downloads
            .open_group(&title, GroupMeasure::FileCount, files.len(), owner_profile.clone())
            .await;
        info!("开始安装实例: {}, 共 {} 个文件", instance_name, files.len());

        let mut report = InstallReport {
            group_id: group.id.clone(),
            completed: Vec::new(),
            failed: Vec::new(),
        };
        let estimate = self.downloads.settings().group_file_estimate_bytes;

        for (index, file) in files.iter().enumerate() {
            let watch = self
                .downloads
                .start_tracked(TrackedRequest {
                    source: file.url.clone(),
                    filename: file.filename.clone(),
                    display_name: file.display_name.clone(),
                    bytes_estimate: estimate,
                    owner_profile: owner_profile.clone(),
                    group_id: Some(group.id.clone()),
                })
                .await;

            match watch.wait_terminal().await {
                TaskOutcome::Completed { .. } => report.completed.push(file.display_name.clone()),
                TaskOutcome::Failed { message } => {
                    warn!("文件下载失败，继续下一个: {}, 错误: {}", file.display_name, message);
                    report.failed.push((file.display_name.clone(), message));
                }
            }
            info!("实例 {} 进度: {}/{}", instance_name, index + 1, files.len());
        }

        self.downloads.settle_group(&group.id).await;
        info!(
            "实例安装结束: {}, 成功 {}, 失败 {}",
            instance_name,
            report.completed.len(),
            report.failed.len()
        );
        report
    }
}
