use dashmap::DashMap;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

use crate::common::logger::PrettyLogger;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    // 带进度的通知（百分比）
    pub progress: Option<u8>,
}

impl Notification {
    pub fn progress(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            kind: NotificationKind::Info,
            progress: Some(0),
        }
    }

    pub fn success(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            kind: NotificationKind::Success,
            progress: None,
        }
    }

    pub fn error(title: &str, message: &str) -> Self {
        Self {
            title: title.to_string(),
            message: message.to_string(),
            kind: NotificationKind::Error,
            progress: None,
        }
    }
}

/// 外部通知服务
pub trait Notifier: Send + Sync {
    fn show(&self, notification: Notification) -> String;
    fn update_progress(&self, notification_id: &str, percent: u8, message: &str);
    fn dismiss(&self, notification_id: &str);
}

#[derive(Debug, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn show(&self, _notification: Notification) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn update_progress(&self, _notification_id: &str, _percent: u8, _message: &str) {}

    fn dismiss(&self, _notification_id: &str) {}
}

/// 终端通知：进度通知画成进度条，其他通知直接打印
pub struct ConsoleNotifier {
    multi_pb: MultiProgress,
    bars: DashMap<String, ProgressBar>,
}

impl Default for ConsoleNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleNotifier {
    pub fn new() -> Self {
        Self {
            multi_pb: MultiProgress::new(),
            bars: DashMap::new(),
        }
    }

    fn bar_style() -> ProgressStyle {
        ProgressStyle::with_template("{spinner:.green} {prefix} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .map(|style| style.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Notifier for ConsoleNotifier {
    fn show(&self, notification: Notification) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        match notification.progress {
            Some(percent) => {
                let pb = self.multi_pb.add(ProgressBar::new(100));
                pb.set_style(Self::bar_style());
                pb.set_prefix(notification.title);
                pb.set_message(notification.message);
                pb.set_position(u64::from(percent));
                self.bars.insert(id.clone(), pb);
            }
            None => {
                let line = format!("{}: {}", notification.title, notification.message);
                match notification.kind {
                    NotificationKind::Success => PrettyLogger::success(line),
                    NotificationKind::Info => PrettyLogger::info(line),
                    NotificationKind::Warning => PrettyLogger::warning(line),
                    NotificationKind::Error => PrettyLogger::error(line),
                }
            }
        }
        id
    }

    fn update_progress(&self, notification_id: &str, percent: u8, message: &str) {
        if let Some(pb) = self.bars.get(notification_id) {
            pb.set_position(u64::from(percent));
            if !message.is_empty() {
                pb.set_message(message.to_string());
            }
        }
    }

    fn dismiss(&self, notification_id: &str) {
        if let Some((_, pb)) = self.bars.remove(notification_id) {
            pb.finish_and_clear();
            self.multi_pb.remove(&pb);
        }
    }
}
