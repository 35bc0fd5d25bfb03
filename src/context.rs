//! 运行上下文
//!
//! 一次运行只有一个统计年度和一个本人账号，二者连同备份索引、配置
//! 一起显式传递给各个模块，不放在全局变量里。

use chrono::NaiveDateTime;
use std::path::Path;

use crate::account::SelfAccount;
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::manifest::BackupIndex;
use crate::window::TimeWindow;

/// 运行上下文
#[derive(Debug, Clone)]
pub struct RunContext {
    pub index: BackupIndex,
    pub window: TimeWindow,
    pub account: SelfAccount,
    pub config: ReportConfig,
}

impl RunContext {
    /// 加载清单、确定年度窗口、识别本人账号
    pub fn prepare(
        backup_dir: &Path,
        now: NaiveDateTime,
        config: ReportConfig,
    ) -> Result<Self, ReportError> {
        tracing::debug!("[Context] 备份目录: {:?}", backup_dir);
        let index = BackupIndex::open(backup_dir, &config.app_domain)?;
        let window = TimeWindow::from_reference(now);
        tracing::debug!("[Context] 统计年度: {}", window.year);
        let account = SelfAccount::discover(&index, &config.fallback_name)?;

        Ok(Self {
            index,
            window,
            account,
            config,
        })
    }
}
