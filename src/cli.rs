use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// 启动器下载工具
#[derive(Parser, Debug)]
#[command(name = "launcherdl")]
#[command(version = "0.1")]
#[command(author = "rpeng252@gmail.com")]
#[command(about = "启动器下载引擎：单文件下载、实例安装与下载队列", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// 当前档案，只显示属于该档案或无归属的记录
    #[arg(long, global = true, value_name = "PROFILE")]
    pub profile: Option<String>,

    /// 状态文件目录
    #[arg(long, global = true, value_name = "DIR")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub state_dir: Option<PathBuf>,

    /// 文件保存目录
    #[arg(long, global = true, value_name = "DIR")]
    #[arg(value_hint = clap::ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// JSON 配置文件
    #[arg(long, global = true, value_name = "FILE")]
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 下载单个文件
    Get {
        #[arg(value_name = "URL")]
        #[arg(value_hint = clap::ValueHint::Url)]
        url: String,

        /// 显示名称，默认取链接里的文件名
        #[arg(long, value_name = "NAME")]
        name: Option<String>,
    },

    /// 按顺序下载一组文件，作为一次实例安装
    Install {
        #[arg(value_name = "INSTANCE")]
        instance: String,

        #[arg(value_name = "URL", required = true)]
        urls: Vec<String>,
    },

    /// 查看下载记录
    History {
        /// 显示所有档案的记录
        #[arg(long)]
        all_profiles: bool,
    },

    /// 清除已完成的下载记录
    Clear,

    /// 多项下载队列
    #[command(subcommand)]
    Queue(QueueCommand),
}

#[derive(Subcommand, Debug)]
pub enum QueueCommand {
    /// 加入队列
    Add(QueueAddArgs),
    /// 列出队列
    List,
    /// 启用或禁用一项
    Toggle {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// 移除未开始的一项
    Remove {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// 把已结束的一项放回待下载
    Reset {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// 清除已完成的项
    Clear,
    /// 运行所有启用的项
    Run {
        /// 同时下载所有项
        #[arg(long)]
        parallel: bool,
    },
}

#[derive(Args, Debug)]
pub struct QueueAddArgs {
    /// 内容 id（目前直接使用下载链接）
    #[arg(value_name = "CONTENT")]
    pub content_id: String,

    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    #[arg(long, value_name = "VERSION", default_value = "latest")]
    pub version: String,

    #[arg(long, value_name = "LOADER")]
    pub loader: Option<String>,

    #[arg(long, value_name = "PLATFORM", default_value = "any")]
    pub platform: String,

    /// 保存目录，相对于文件保存目录
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub dest: String,
}
