/*!
 * 报告配置模块
 *
 * 管理统计口径的可调参数：
 * - 排行榜长度（好友 / 群 / 表情）
 * - 消息摘录数量与长度区间
 * - 备份应用域、本人信息解析失败时的默认昵称
 *
 * 配置文件可选，缺失时使用默认值；字段缺省时逐项回退默认值。
 */

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// 错误类型
// ============================================================================

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败: {0}")]
    Read(#[from] std::io::Error),
    #[error("配置文件解析失败: {0}")]
    Parse(#[from] serde_json::Error),
}

// ============================================================================
// 配置结构
// ============================================================================

/// 报告配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportConfig {
    /// 好友排行长度
    pub top_friends: usize,
    /// 群聊排行长度
    pub top_groups: usize,
    /// 表情排行长度
    pub top_emoji: usize,
    /// 消息摘录条数
    pub clip_count: usize,
    /// 摘录长度下限（不含）
    pub clip_min_exclusive: usize,
    /// 摘录长度上限（不含）
    pub clip_max_exclusive: usize,
    /// 清单中的应用域
    pub app_domain: String,
    /// 本人昵称解析失败时的默认值
    pub fallback_name: String,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_friends: 5,
            top_groups: 5,
            top_emoji: 4,
            clip_count: 4,
            clip_min_exclusive: 8,
            clip_max_exclusive: 17,
            app_domain: "AppDomain-com.tencent.xin".to_string(),
            fallback_name: "微信用户".to_string(),
        }
    }
}

impl ReportConfig {
    /// 读取配置文件，不存在时返回默认配置
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("[Config] 配置文件不存在，使用默认配置: {:?}", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        tracing::debug!("[Config] 已加载配置: {:?}", path);
        Ok(config)
    }

    /// 摘录长度是否在区间内
    pub fn clip_len_ok(&self, len: usize) -> bool {
        len > self.clip_min_exclusive && len < self.clip_max_exclusive
    }
}
