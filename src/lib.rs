//! WeChat Annual - 年度统计数据管线
//!
//! 从未加密的本地备份中还原一年的聊天记录并计算年度统计：
//!
//! ```text
//! BackupIndex -> ContactRepository -> MessageRepository -> StatsAggregator
//! ```
//!
//! 输入只有备份根目录和运行时刻；输出报告本身以及渲染需要的联系人、
//! 消息表。报告按账号缓存，同一账号再次运行直接读取缓存。

// ============================================
// 数据源
// ============================================
pub mod account;
pub mod backup_dir;
pub mod blob;
pub mod db;
pub mod manifest;
pub mod xml;

// ============================================
// 统计与输出
// ============================================
pub mod config;
pub mod context;
pub mod error;
pub mod stats;
pub mod storage;
pub mod window;

use chrono::NaiveDateTime;
use rand::Rng;
use std::path::PathBuf;

use config::ReportConfig;
use context::RunContext;
use db::{ContactRepository, ContactTable, MessageRepository, MessageSets, SessionRecord};
use error::ReportError;
use stats::{StatsAggregator, StatsReport};
use storage::ReportCache;

/// 一次运行的输入
#[derive(Debug, Clone)]
pub struct ReportRequest {
    /// 备份根目录（含 Manifest.db）
    pub backup_dir: PathBuf,
    /// 报告缓存目录
    pub workdir: PathBuf,
    /// 运行时刻（本地时间），只用于确定统计年度
    pub now: NaiveDateTime,
    pub config: ReportConfig,
    /// 忽略已有缓存重新统计
    pub force: bool,
}

/// 渲染报告需要的中间表
#[derive(Debug, Clone)]
pub struct AnnualTables {
    pub friends: ContactTable,
    pub groups: ContactTable,
    pub messages: MessageSets,
    pub sessions: Vec<SessionRecord>,
}

/// 一次运行的输出
#[derive(Debug, Clone)]
pub struct AnnualOutput {
    pub report: StatsReport,
    /// 命中缓存时为 None
    pub tables: Option<AnnualTables>,
    /// 缓存文件路径（写入失败时为 None）
    pub cache_path: Option<PathBuf>,
    pub from_cache: bool,
}

/// 生成年度报告
pub fn generate_report(request: &ReportRequest) -> Result<AnnualOutput, ReportError> {
    generate_report_with_rng(request, &mut rand::thread_rng())
}

/// 生成年度报告（指定随机源，用于消息摘录抽样）
pub fn generate_report_with_rng<R: Rng + ?Sized>(
    request: &ReportRequest,
    rng: &mut R,
) -> Result<AnnualOutput, ReportError> {
    let ctx = RunContext::prepare(&request.backup_dir, request.now, request.config.clone())?;
    let cache = ReportCache::new(&request.workdir);

    if !request.force {
        match cache.load::<StatsReport>(&ctx.account.id) {
            Ok(Some(report)) => {
                tracing::info!("[Annual] 已有 {} 的统计结果，跳过计算", ctx.account.id);
                return Ok(AnnualOutput {
                    report,
                    tables: None,
                    cache_path: Some(cache.path_for(&ctx.account.id)),
                    from_cache: true,
                });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("[Annual] 缓存无法读取，重新计算: {}", e),
        }
    }

    let (report, tables) = compute(&ctx, rng)?;

    let cache_path = match cache.save(&ctx.account.id, &report) {
        Ok(path) => Some(path),
        Err(e) => {
            tracing::warn!("[Annual] 报告缓存写入失败: {}", e);
            None
        }
    };

    Ok(AnnualOutput {
        report,
        tables: Some(tables),
        cache_path,
        from_cache: false,
    })
}

/// 读取联系人、消息、会话并统计
pub fn compute<R: Rng + ?Sized>(
    ctx: &RunContext,
    rng: &mut R,
) -> Result<(StatsReport, AnnualTables), ReportError> {
    tracing::info!("[Annual] 读取 {} 年的微信数据", ctx.window.year);

    let contacts = ContactRepository::locate(&ctx.index, &ctx.account)?;
    let friends = contacts.load_friends()?;
    let groups = contacts.load_groups()?;

    let repo = MessageRepository::discover(&ctx.index, &ctx.account, ctx.window);
    let messages = MessageSets::collect(&repo, &friends, &groups);
    let sessions = db::load_sessions(&ctx.index, &ctx.account, &ctx.window);

    let report = StatsAggregator::new(&ctx.account, &ctx.config)
        .aggregate(&messages, &friends, &groups, &sessions, rng);

    Ok((
        report,
        AnnualTables {
            friends,
            groups,
            messages,
            sessions,
        },
    ))
}
