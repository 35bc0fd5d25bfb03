use anyhow::Context;
use chrono::Local;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use wechat_annual_lib::backup_dir::locate_latest_backup;
use wechat_annual_lib::config::ReportConfig;
use wechat_annual_lib::error::ReportError;
use wechat_annual_lib::{generate_report, ReportRequest};

/// 配置文件默认名
const CONFIG_FILE: &str = "annual.config.json";

#[derive(Parser, Debug)]
#[command(name = "wechat-annual", version, about = "从本地备份生成微信年度统计")]
struct Args {
    /// 备份目录（含 Manifest.db），缺省时自动查找最近的本地备份
    #[arg(short, long)]
    backup_dir: Option<PathBuf>,

    /// 报告输出目录
    #[arg(short, long, default_value = ".")]
    workdir: PathBuf,

    /// 配置文件，缺省为 {workdir}/annual.config.json
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 日志级别（trace / debug / info / warn / error）
    #[arg(short, long, default_value = "info")]
    loglevel: String,

    /// 忽略已有的统计结果重新计算
    #[arg(long)]
    force: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.loglevel).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let backup_dir = match args.backup_dir {
        Some(dir) => dir,
        None => locate_latest_backup().ok_or(ReportError::BackupDirNotFound)?,
    };
    tracing::debug!("工作目录: {:?}", args.workdir);

    let config_path = args
        .config
        .unwrap_or_else(|| args.workdir.join(CONFIG_FILE));
    let config = ReportConfig::load_or_default(&config_path)
        .with_context(|| format!("读取配置 {:?} 失败", config_path))?;

    let request = ReportRequest {
        backup_dir,
        workdir: args.workdir,
        now: Local::now().naive_local(),
        config,
        force: args.force,
    };

    let output = generate_report(&request).context("生成年度报告失败")?;
    let report = &output.report;

    tracing::info!(
        "{} 的年度统计：活跃 {} 天，发出 {} 条消息，新增 {} 位好友、{} 个群聊",
        report.myself.name,
        report.myself.active_days,
        report.myself.message.count,
        report.friend.new.count,
        report.group.new.count
    );
    if let Some(path) = &output.cache_path {
        tracing::info!("统计结果已保存到 {:?}", path);
    }

    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
