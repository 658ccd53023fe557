mod common;

use std::time::Duration;

use common::{NoticeCall, manual, scripted};
use launcher_downloader::downloader::TaskStatus;
use launcher_downloader::downloader::notify::NotificationKind;
use launcher_downloader::downloader::progress;

#[tokio::test]
async fn test_progress_then_complete() {
    let env = manual(None);
    let task = env
        .manager
        .create("https://cdn.example.com/sodium.jar", "Sodium 0.5", None)
        .await;
    assert_eq!(task.status, TaskStatus::Active);
    assert_eq!(task.bytes_total, 1000);

    // 传输文件名由显示名得出，空白换成下划线
    let requests = env.transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].filename, "Sodium_0.5");

    env.manager.on_progress(&task.id, 0.5).await;
    let halfway = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(halfway.status, TaskStatus::Active);
    assert_eq!(halfway.progress_fraction, 0.5);
    assert_eq!(halfway.bytes_transferred, 500);

    env.manager.on_complete(&task.id, "/downloads/Sodium_0.5").await;
    let done = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.progress_fraction, 1.0);
    assert_eq!(done.bytes_transferred, done.bytes_total);
    assert_eq!(done.destination_path.as_deref(), Some("/downloads/Sodium_0.5"));
    assert!(done.completed_at.is_some());
    println!("✅ 进度与完成流程正常");
}

#[tokio::test]
async fn test_complete_twice_is_noop() {
    let env = manual(None);
    let task = env.manager.create("https://a/b.zip", "b", None).await;
    env.manager.on_complete(&task.id, "/first").await;
    let first = env.manager.get_download(&task.id).await.unwrap();

    env.manager.on_complete(&task.id, "/second").await;
    let second = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(first, second);

    // 终态之后的进度也被忽略
    env.manager.on_progress(&task.id, 0.2).await;
    assert_eq!(env.manager.get_download(&task.id).await.unwrap(), first);
}

#[tokio::test]
async fn test_unknown_id_is_ignored() {
    let env = manual(None);
    env.manager.on_progress("missing", 0.5).await;
    env.manager.on_complete("missing", "/x").await;
    env.manager.on_error("missing", "boom").await;

    assert!(env.manager.start("missing").await.is_none());
    assert!(!env.manager.pause("missing").await);
    assert!(!env.manager.cancel("missing").await);
    assert!(env.manager.get_all_downloads().await.is_empty());
    assert!(env.store.get("downloads").is_none());
}

#[tokio::test]
async fn test_progress_is_clamped_and_monotonic() {
    let env = manual(None);
    let task = env.manager.create("https://a/b.zip", "b", None).await;

    env.manager.on_progress(&task.id, 1.7).await;
    assert_eq!(env.manager.get_download(&task.id).await.unwrap().progress_fraction, 1.0);
    assert_eq!(env.manager.get_download(&task.id).await.unwrap().status, TaskStatus::Active);

    env.manager.on_progress(&task.id, 0.3).await;
    assert_eq!(env.manager.get_download(&task.id).await.unwrap().progress_fraction, 1.0);

    assert_eq!(progress::clamp_fraction(-0.5), 0.0);
    assert_eq!(progress::clamp_fraction(f64::NAN), 0.0);
    assert_eq!(progress::round_fraction(0.123456), 0.1235);
}

#[tokio::test]
async fn test_pause_resume_cancel_restart() {
    let env = manual(None);
    let task = env.manager.create("https://a/pack.zip", "pack", None).await;
    env.manager.on_progress(&task.id, 0.4).await;

    assert!(env.manager.pause(&task.id).await);
    assert!(!env.manager.pause(&task.id).await);
    // 暂停中不接受进度
    env.manager.on_progress(&task.id, 0.9).await;
    let paused = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(paused.status, TaskStatus::Paused);
    assert_eq!(paused.progress_fraction, 0.4);

    let resumed = env.manager.resume(&task.id).await.unwrap();
    assert_eq!(resumed.status, TaskStatus::Active);
    assert_eq!(env.transport.requests().len(), 2);
    // 已经在下载，resume 不再生效
    assert!(env.manager.resume(&task.id).await.is_none());

    assert!(env.manager.cancel(&task.id).await);
    let cancelled = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(cancelled.status, TaskStatus::Failed);
    assert!(cancelled.error_message.is_some());
    assert!(!env.manager.cancel(&task.id).await);

    // 失败后可以重新开始，进度清零
    let restarted = env.manager.start(&task.id).await.unwrap();
    assert_eq!(restarted.status, TaskStatus::Active);
    assert_eq!(restarted.progress_fraction, 0.0);
    assert_eq!(restarted.bytes_transferred, 0);
    assert!(restarted.completed_at.is_none());
    assert!(restarted.error_message.is_none());
    assert_eq!(env.transport.requests().len(), 3);
}

#[tokio::test]
async fn test_length_event_replaces_placeholder() {
    let env = manual(None);
    let task = env.manager.create("https://a/big.zip", "big", None).await;
    env.manager.on_progress(&task.id, 0.5).await;
    env.manager.on_length(&task.id, 4000).await;

    let updated = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(updated.bytes_total, 4000);
    assert_eq!(updated.bytes_transferred, 2000);
}

#[tokio::test]
async fn test_remove_and_clear_completed() {
    let env = manual(None);
    let a = env.manager.create("https://a/1.zip", "one", None).await;
    let b = env.manager.create("https://a/2.zip", "two", None).await;
    let c = env.manager.create("https://a/3.zip", "three", None).await;
    env.manager.on_complete(&a.id, "/1").await;
    env.manager.on_complete(&b.id, "/2").await;

    assert_eq!(env.manager.clear_completed().await, 2);
    assert_eq!(env.manager.clear_completed().await, 0);
    assert_eq!(env.manager.get_all_downloads().await.len(), 1);

    assert!(env.manager.remove(&c.id).await);
    assert!(!env.manager.remove(&c.id).await);
    assert!(env.manager.get_all_downloads().await.is_empty());
}

#[tokio::test]
async fn test_active_and_completed_views() {
    let env = manual(None);
    let a = env.manager.create("https://a/1.zip", "one", None).await;
    let b = env.manager.create("https://a/2.zip", "two", None).await;
    let c = env.manager.create("https://a/3.zip", "three", None).await;
    env.manager.pause(&b.id).await;
    env.manager.on_complete(&c.id, "/3").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    env.manager.on_complete(&a.id, "/1").await;

    let active = env.manager.get_active_downloads().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, b.id);

    // 最近完成的在前
    let completed = env.manager.get_completed_downloads().await;
    assert_eq!(completed.iter().map(|t| t.id.clone()).collect::<Vec<_>>(), vec![a.id, c.id]);
}

#[tokio::test]
async fn test_progress_notifications_are_throttled() {
    let env = manual(None);
    let task = env.manager.create("https://a/b.zip", "b", None).await;

    env.manager.on_progress(&task.id, 0.5).await;
    env.manager.on_progress(&task.id, 0.5).await;
    env.manager.on_progress(&task.id, 0.501).await;
    assert_eq!(env.notifier.shown().len(), 1);
    assert!(env.notifier.updates().is_empty());

    env.manager.on_progress(&task.id, 0.6).await;
    assert_eq!(env.notifier.updates(), vec![60]);

    env.manager.on_complete(&task.id, "/b").await;
    let shown = env.notifier.shown();
    assert_eq!(shown.len(), 2);
    assert_eq!(shown[1].kind, NotificationKind::Success);
    assert_eq!(env.notifier.updates(), vec![60, 100]);

    // 进度通知在延迟之后关闭
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(
        env.notifier
            .calls()
            .iter()
            .any(|c| matches!(c, NoticeCall::Dismiss(id) if id == "notice-1"))
    );
    println!("✅ 通知节流正常");
}

#[tokio::test]
async fn test_error_event_fails_task_and_notifies() {
    let env = manual(None);
    let task = env.manager.create("https://a/b.zip", "b", None).await;
    env.manager.on_error(&task.id, "连接超时").await;

    let failed = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error_message.as_deref(), Some("连接超时"));
    assert!(
        env.notifier
            .shown()
            .iter()
            .any(|n| n.kind == NotificationKind::Error && n.message == "连接超时")
    );

    // 失败之后的完成事件被忽略
    env.manager.on_complete(&task.id, "/b").await;
    assert_eq!(env.manager.get_download(&task.id).await.unwrap().status, TaskStatus::Failed);
}

#[tokio::test]
async fn test_watch_resolves_through_event_pump() {
    let env = scripted(&[]);
    let task = env.manager.create("https://a/mod.jar", "mod", None).await;
    let watch = env.manager.watch(&task.id).await.unwrap();
    let outcome = watch.wait_terminal().await;

    assert!(outcome.is_success());
    let done = env.manager.get_download(&task.id).await.unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
    // 传输层报告的真实大小
    assert_eq!(done.bytes_total, 2048);
    assert_eq!(done.bytes_transferred, 2048);
}
