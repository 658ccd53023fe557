use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::error::{DownloadError, Result};

/// 传输层按任务 id 回报的事件
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    // 拿到真实文件大小
    Length { task_id: String, total_bytes: u64 },
    Progress { task_id: String, fraction: f64 },
    Complete { task_id: String, path: String },
    Error { task_id: String, message: String },
}

pub type EventSender = mpsc::UnboundedSender<TransportEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub task_id: String,
    pub source: String,
    pub filename: String,
}

/// 真正搬运字节的组件。start 立即返回，结果通过事件通道送回。
pub trait Transport: Send + Sync {
    fn start(&self, request: TransferRequest);
}

// 基于 reqwest 的流式下载
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    output_dir: PathBuf,
    events: EventSender,
}

impl HttpTransport {
    pub fn new(output_dir: impl AsRef<Path>, timeout: Duration, events: EventSender) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            output_dir: output_dir.as_ref().to_path_buf(),
            events,
        })
    }

    async fn fetch(
        client: &reqwest::Client,
        request: &TransferRequest,
        output_dir: &Path,
        events: &EventSender,
    ) -> Result<String> {
        let url = url::Url::parse(&request.source)
            .map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", request.source, e)))?;

        // 文件名可以带子目录
        let output_path = output_dir.join(&request.filename);
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = client.get(url).send().await?;
        Self::check_response_status(&response, &request.source)?;

        let total_size = response.content_length().unwrap_or(0);
        if total_size > 0 {
            let _ = events.send(TransportEvent::Length {
                task_id: request.task_id.clone(),
                total_bytes: total_size,
            });
        }

        debug!("开始下载文件: {} -> {}", request.source, output_path.display());
        let mut file = tokio::fs::File::create(&output_path).await?;
        let mut stream = response.bytes_stream();

        let mut downloaded = 0u64;
        let mut last_percent = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| DownloadError::Transport(e.to_string()))?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            // 大小未知时无法换算比例，只在完成时回报
            if total_size > 0 {
                let percent = downloaded * 100 / total_size;
                if percent > last_percent {
                    last_percent = percent;
                    let _ = events.send(TransportEvent::Progress {
                        task_id: request.task_id.clone(),
                        fraction: downloaded as f64 / total_size as f64,
                    });
                }
            }
        }
        file.flush().await?;

        Ok(output_path.to_string_lossy().into_owned())
    }

    fn check_response_status(response: &reqwest::Response, url: &str) -> Result<()> {
        let status = response.status();
        debug!("Response Status: {}", status);

        match status {
            reqwest::StatusCode::FORBIDDEN => {
                warn!("🚫 检测到 403 Forbidden 状态码");
                Err(DownloadError::Transport(format!("访问被拒绝 (403 Forbidden)，URL: {}", url)))
            }
            reqwest::StatusCode::TOO_MANY_REQUESTS => {
                warn!("⚠️ 检测到 429 Too Many Requests 状态码，请求过于频繁");
                Err(DownloadError::Transport(format!(
                    "请求过于频繁 (429 Too Many Requests)，URL: {}",
                    url
                )))
            }
            status if status.is_success() => Ok(()),
            _ => {
                warn!("❌ 非成功状态码: {}", status);
                Err(DownloadError::Transport(format!(
                    "HTTP 请求失败，状态码: {}，URL: {}",
                    status, url
                )))
            }
        }
    }
}

impl Transport for HttpTransport {
    fn start(&self, request: TransferRequest) {
        let client = self.client.clone();
        let output_dir = self.output_dir.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            info!("开始传输: {} ({})", request.filename, request.task_id);
            let event = match Self::fetch(&client, &request, &output_dir, &events).await {
                Ok(path) => TransportEvent::Complete {
                    task_id: request.task_id.clone(),
                    path,
                },
                Err(e) => {
                    error!("❌ 传输失败: {}, 错误: {}", request.task_id, e);
                    TransportEvent::Error {
                        task_id: request.task_id.clone(),
                        message: e.to_string(),
                    }
                }
            };
            if events.send(event).is_err() {
                warn!("事件通道已关闭，丢弃任务 {} 的结果", request.task_id);
            }
        });
    }
}
