use colored::*;

use crate::downloader::task::{DownloadTask, TaskStatus};
use crate::queue::models::{QueueItem, QueueStatus};

/// 初始化 tracing 日志
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).with_target(false).init();
}

/// 漂亮的日志输出工具
pub struct PrettyLogger;

impl PrettyLogger {
    /// 显示成功消息
    pub fn success(message: impl AsRef<str>) {
        println!("{} {}", "✓".green().bold(), message.as_ref());
    }

    /// 显示信息消息
    pub fn info(message: impl AsRef<str>) {
        println!("{} {}", "ℹ".blue().bold(), message.as_ref());
    }

    /// 显示警告消息
    pub fn warning(message: impl AsRef<str>) {
        println!("{} {}", "⚠".yellow().bold(), message.as_ref());
    }

    /// 显示错误消息
    pub fn error(message: impl AsRef<str>) {
        println!("{} {}", "✗".red().bold(), message.as_ref());
    }

    /// 显示步骤开始
    pub fn step_start(step: impl AsRef<str>) {
        println!("\n{} {}", "▶".cyan().bold(), step.as_ref().bold());
    }

    pub fn separator() {
        println!("{}", "─".repeat(50).bright_black());
    }

    /// 一行显示一个下载任务
    pub fn task_line(task: &DownloadTask) {
        let status = match task.status {
            TaskStatus::Pending => "等待".bright_black(),
            TaskStatus::Active => "下载中".blue(),
            TaskStatus::Paused => "已暂停".yellow(),
            TaskStatus::Completed => "完成".green(),
            TaskStatus::Failed => "失败".red(),
        };
        let kind = if task.is_group() { "📦" } else { "⬇" };
        println!(
            "{} {} [{}] {:>3}% {}",
            kind,
            task.display_name.bold(),
            status,
            task.percent(),
            task.id.bright_black()
        );
        if let Some(message) = &task.error_message {
            println!("    {}", message.red());
        }
    }

    /// 一行显示一个队列项
    pub fn queue_line(item: &QueueItem) {
        let status = match item.status {
            QueueStatus::Pending => "待下载".bright_black(),
            QueueStatus::Downloading => "下载中".blue(),
            QueueStatus::Completed => "完成".green(),
            QueueStatus::Error => "失败".red(),
            QueueStatus::Disabled => "已禁用".yellow(),
        };
        let enabled = if item.enabled { "●".green() } else { "○".bright_black() };
        println!(
            "{} {} {} [{}] {}",
            enabled,
            item.display_name.bold(),
            item.version.cyan(),
            status,
            item.id.bright_black()
        );
        if let Some(error) = &item.error {
            println!("    {}", error.red());
        }
    }
}

/// 便捷宏用于漂亮的日志输出
#[macro_export]
macro_rules! log_success {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::success(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::info(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::warning(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::error(format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_step {
    ($($arg:tt)*) => {
        $crate::common::logger::PrettyLogger::step_start(format!($($arg)*))
    };
}
