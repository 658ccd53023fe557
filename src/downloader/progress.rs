//! 进度聚合的纯计算部分：百分比、字节数、速度，以及分组的汇总。

use chrono::{DateTime, Utc};

use super::task::{DownloadTask, GroupMeasure, TaskStatus};

/// 存储的进度统一限制在 [0, 1]
pub fn clamp_fraction(fraction: f64) -> f64 {
    if fraction.is_nan() {
        return 0.0;
    }
    fraction.clamp(0.0, 1.0)
}

/// 保留两位小数的百分比精度
pub fn round_fraction(fraction: f64) -> f64 {
    (clamp_fraction(fraction) * 10_000.0).round() / 10_000.0
}

pub fn percent(fraction: f64) -> u8 {
    (clamp_fraction(fraction) * 100.0).round() as u8
}

/// 字节/秒；耗时不大于 0 时返回 None，调用方保留原值
pub fn transfer_rate(bytes: u64, started_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<u64> {
    let elapsed_ms = (now - started_at).num_milliseconds();
    if elapsed_ms <= 0 {
        return None;
    }
    let elapsed_secs = elapsed_ms as f64 / 1000.0;
    Some((bytes as f64 / elapsed_secs).round() as u64)
}

/// 应用一次传输进度。只有下载中的任务接受进度，且进度不回退。
pub fn apply_fraction(task: &mut DownloadTask, fraction: f64, now: DateTime<Utc>) -> bool {
    if task.status != TaskStatus::Active {
        return false;
    }
    let fraction = clamp_fraction(fraction);
    let stored = round_fraction(fraction);
    if stored < task.progress_fraction {
        return false;
    }

    task.progress_fraction = stored;
    task.bytes_transferred = (task.bytes_total as f64 * fraction).round() as u64;
    if let Some(rate) = transfer_rate(task.bytes_transferred, task.started_at, now) {
        task.transfer_rate = rate;
    }
    true
}

/// 传输层报告了真实大小，替换预估值
pub fn apply_length(task: &mut DownloadTask, total_bytes: u64) {
    task.bytes_total = total_bytes;
    let fraction = clamp_fraction(task.progress_fraction);
    task.bytes_transferred = (total_bytes as f64 * fraction).round() as u64;
}

/// 根据成员重新计算分组的字节数、进度和速度。
///
/// `members` 中缺失的成员（已被移除）按已结束计算。
pub fn aggregate_group(group: &mut DownloadTask, members: &[Option<&DownloadTask>], now: DateTime<Utc>) {
    let Some(info) = group.group.as_mut() else {
        return;
    };

    let transferred: u64 = members.iter().flatten().map(|m| m.bytes_transferred).sum();
    let total: u64 = members.iter().flatten().map(|m| m.bytes_total).sum();
    info.resolved = members
        .iter()
        .filter(|m| m.is_none_or(|t| t.status.is_terminal()))
        .count();

    let fraction = match info.measure {
        GroupMeasure::Bytes => {
            group.bytes_total = total;
            if total > 0 {
                transferred as f64 / total as f64
            } else {
                0.0
            }
        }
        GroupMeasure::FileCount => {
            // 成员是逐个登记的，总大小在全部登记前仍沿用预估值
            group.bytes_total = group.bytes_total.max(total);
            if info.expected > 0 {
                info.resolved as f64 / info.expected as f64
            } else {
                1.0
            }
        }
    };
    group.bytes_transferred = transferred;

    let fraction = round_fraction(fraction);
    if fraction > group.progress_fraction {
        group.progress_fraction = fraction;
    }
    if let Some(rate) = transfer_rate(group.bytes_transferred, group.started_at, now) {
        group.transfer_rate = rate;
    }
}

/// 所有预期成员都已登记且都已结束
pub fn group_settled(group: &DownloadTask) -> bool {
    group
        .group
        .as_ref()
        .is_some_and(|info| info.members.len() == info.expected && info.resolved >= info.expected)
}
