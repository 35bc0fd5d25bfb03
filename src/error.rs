//! 错误类型
//!
//! 只有致命错误会返回到调用方：清单不可读、必需文件缺失、联系人库读取失败、
//! 配置文件损坏。其余失败（备注损坏、分片打不开、会话库缺失等）都在
//! 各模块内降级处理并记录警告。

use thiserror::Error;

use crate::config::ConfigError;
use crate::manifest::BackupError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error(transparent)]
    Backup(#[from] BackupError),

    #[error("联系人库读取失败: {0}")]
    Contacts(#[from] rusqlite::Error),

    #[error("报告缓存失败: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("未找到本地备份目录")]
    BackupDirNotFound,
}
