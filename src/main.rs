use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing::{debug, info};

use launcher_downloader::common::config::EngineConfig;
use launcher_downloader::common::logger::{self, PrettyLogger};
use launcher_downloader::downloader::models::filename_from_url;
use launcher_downloader::downloader::notify::ConsoleNotifier;
use launcher_downloader::downloader::persistence::JsonFileStore;
use launcher_downloader::downloader::profile::ActiveProfile;
use launcher_downloader::downloader::transport::{HttpTransport, event_channel};
use launcher_downloader::downloader::{
    Collaborators, DownloadError, DownloadManager, GroupOrchestrator, InstallFile, ManagerSettings, TaskOutcome,
};
use launcher_downloader::queue::{
    DirectUrlResolver, QueueItemRequest, QueueManager, RunMode, TransferExecutor,
};
use launcher_downloader::{log_error, log_info, log_step, log_success, log_warning};

mod cli;

use cli::{Cli, Command, QueueCommand};

struct Engine {
    config: EngineConfig,
    downloads: DownloadManager,
    queue: QueueManager,
}

/// 读取配置，命令行参数优先
async fn load_config(args: &Cli) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .await
            .with_context(|| format!("读取配置文件失败: {:?}", path))?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = &args.state_dir {
        config.state_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }
    debug!("引擎配置: {:?}", config);
    Ok(config)
}

async fn build_engine(args: &Cli) -> Result<Engine> {
    let config = load_config(args).await?;
    let store = Arc::new(JsonFileStore::new(&config.state_dir));

    let (events, receiver) = event_channel();
    let transport = HttpTransport::new(
        &config.output_dir,
        Duration::from_secs(config.http_timeout_secs),
        events,
    )
    .context("创建 HTTP 客户端失败")?;

    let downloads = DownloadManager::load(
        ManagerSettings::from(&config),
        Collaborators {
            transport: Arc::new(transport),
            store: store.clone(),
            notifier: Arc::new(ConsoleNotifier::new()),
            profile: Arc::new(ActiveProfile::new(args.profile.as_deref())),
        },
    )
    .await;
    downloads.spawn_event_pump(receiver);

    let queue = QueueManager::load(store).await;
    Ok(Engine {
        config,
        downloads,
        queue,
    })
}

fn display_name_for(url: &str) -> String {
    filename_from_url(url).unwrap_or_else(|| url.to_string())
}

async fn handle_get(engine: &Engine, url: &str, name: Option<String>, profile: Option<String>) -> Result<()> {
    let name = name.unwrap_or_else(|| display_name_for(url));
    log_step!("下载 {}", name);

    let task = engine.downloads.create(url, &name, profile).await;
    let Some(watch) = engine.downloads.watch(&task.id).await else {
        return Err(DownloadError::TaskNotFound(task.id).into());
    };
    match watch.wait_terminal().await {
        TaskOutcome::Completed { path } => {
            PrettyLogger::info(format!("保存到: {}", path));
            Ok(())
        }
        TaskOutcome::Failed { message } => anyhow::bail!("下载失败: {}", message),
    }
}

async fn handle_install(engine: &Engine, instance: &str, urls: &[String], profile: Option<String>) -> Result<()> {
    let files: Vec<InstallFile> = urls
        .iter()
        .map(|url| {
            let name = display_name_for(url);
            InstallFile::new(url, &name, &name)
        })
        .collect();

    log_step!("安装实例 {}，共 {} 个文件", instance, files.len());
    let orchestrator = GroupOrchestrator::new(engine.downloads.clone());
    let report = orchestrator.install_instance(instance, &files, profile).await;

    for (name, message) in &report.failed {
        log_error!("{}: {}", name, message);
    }
    if report.failed.is_empty() {
        log_success!("实例 {} 安装完成，共 {} 个文件", instance, report.processed());
    } else {
        log_warning!(
            "实例 {} 安装结束，成功 {}，失败 {}",
            instance,
            report.completed.len(),
            report.failed.len()
        );
    }
    Ok(())
}

async fn handle_history(engine: &Engine, all_profiles: bool) {
    let tasks = if all_profiles {
        engine.downloads.snapshot().await
    } else {
        engine.downloads.get_all_downloads().await
    };
    if tasks.is_empty() {
        log_info!("没有下载记录");
        return;
    }
    PrettyLogger::separator();
    for task in &tasks {
        PrettyLogger::task_line(task);
    }
    PrettyLogger::separator();
}

async fn handle_queue(engine: &Engine, command: QueueCommand, profile: Option<String>) -> Result<()> {
    let queue = &engine.queue;
    match command {
        QueueCommand::Add(add) => {
            let display_name = add.name.unwrap_or_else(|| display_name_for(&add.content_id));
            let items = queue
                .enqueue(vec![QueueItemRequest {
                    original_content_id: add.content_id,
                    display_name,
                    version: add.version,
                    loader: add.loader,
                    destination_path: add.dest,
                    platform_tag: add.platform,
                    content_kind: None,
                }])
                .await;
            for item in &items {
                log_success!("已加入队列: {} ({})", item.display_name, item.id);
            }
        }
        QueueCommand::List => {
            let items = queue.get_queue().await;
            if items.is_empty() {
                log_info!("队列为空");
            }
            for item in &items {
                PrettyLogger::queue_line(item);
            }
        }
        QueueCommand::Toggle { id } => match queue.toggle_enabled(&id).await {
            Some(true) => log_success!("已启用: {}", id),
            Some(false) => log_success!("已禁用: {}", id),
            None => log_warning!("无法切换（不存在或正在下载）: {}", id),
        },
        QueueCommand::Remove { id } => {
            if queue.remove_item(&id).await {
                log_success!("已移除: {}", id);
            } else {
                log_warning!("无法移除（不存在或已开始）: {}", id);
            }
        }
        QueueCommand::Reset { id } => {
            if queue.reset_item(&id).await {
                log_success!("已重新排队: {}", id);
            } else {
                log_warning!("只有已结束的项可以重置: {}", id);
            }
        }
        QueueCommand::Clear => {
            let removed = queue.clear_completed().await;
            log_info!("清除了 {} 个已完成的项", removed);
        }
        QueueCommand::Run { parallel } => {
            let mode = if parallel {
                RunMode::Parallel
            } else {
                engine.config.queue_run_mode
            };
            let executor = Arc::new(TransferExecutor::new(
                engine.downloads.clone(),
                DirectUrlResolver,
                profile,
            ));
            log_step!("运行下载队列");
            let summary = queue.run(mode, executor).await;
            for item in queue.get_queue().await {
                PrettyLogger::queue_line(&item);
            }
            log_info!(
                "完成 {}，失败 {}，跳过 {}",
                summary.completed.len(),
                summary.failed.len(),
                summary.skipped.len()
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    logger::init_tracing(args.verbose);

    let engine = build_engine(&args).await?;
    info!("状态目录: {:?}", engine.config.state_dir);

    let profile = args.profile.clone();
    match args.command {
        Command::Get { url, name } => handle_get(&engine, &url, name, profile).await?,
        Command::Install { instance, urls } => handle_install(&engine, &instance, &urls, profile).await?,
        Command::History { all_profiles } => handle_history(&engine, all_profiles).await,
        Command::Clear => {
            let removed = engine.downloads.clear_completed().await;
            log_info!("清除了 {} 条已完成的记录", removed);
        }
        Command::Queue(command) => handle_queue(&engine, command, profile).await?,
    }

    println!("{}", "完成".green());
    Ok(())
}
