//! 备份清单模块
//!
//! 读取备份根目录下的 `Manifest.db`，把应用内的逻辑路径映射到
//! 内容寻址的物理文件：
//!
//! ```text
//! {backup}/{fileID[0..2]}/{fileID}
//! ```
//!
//! 清单只加载一次（限定单一应用域、且只保留普通文件），之后只读。

use regex::Regex;
use rusqlite::{Connection, OpenFlags};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 清单文件名
pub const MANIFEST_FILE: &str = "Manifest.db";

/// 清单中普通文件的 flags 取值
const REGULAR_FILE_FLAG: i64 = 1;

// ============================================================================
// 错误类型
// ============================================================================

#[derive(Error, Debug)]
pub enum BackupError {
    /// 清单缺失或无法打开，整个流程无法继续
    #[error("备份不可读 {path:?}: {reason}")]
    NotReadable { path: PathBuf, reason: String },

    /// 清单中没有该逻辑路径
    #[error("备份中找不到文件: {0}")]
    NotFound(String),
}

// ============================================================================
// 清单条目与索引
// ============================================================================

/// 清单条目：逻辑路径 -> 内容哈希
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    pub relative_path: String,
    pub file_id: String,
}

/// 备份索引
#[derive(Debug, Clone)]
pub struct BackupIndex {
    root: PathBuf,
    /// 按清单原始顺序保存，供模式查找使用
    entries: Vec<ManifestEntry>,
    by_path: HashMap<String, usize>,
}

impl BackupIndex {
    /// 从备份根目录加载清单
    pub fn open(root: impl AsRef<Path>, domain: &str) -> Result<Self, BackupError> {
        let root = root.as_ref().to_path_buf();
        let manifest_path = root.join(MANIFEST_FILE);

        if !manifest_path.is_file() {
            return Err(BackupError::NotReadable {
                path: manifest_path,
                reason: "清单文件不存在".to_string(),
            });
        }

        let not_readable = |e: rusqlite::Error| BackupError::NotReadable {
            path: manifest_path.clone(),
            reason: e.to_string(),
        };

        let conn = Connection::open_with_flags(&manifest_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(not_readable)?;

        let mut stmt = conn
            .prepare(
                "SELECT relativePath, fileID
                 FROM Files
                 WHERE domain = ?1 AND flags = ?2
                 ORDER BY rowid",
            )
            .map_err(not_readable)?;

        let entries = stmt
            .query_map(rusqlite::params![domain, REGULAR_FILE_FLAG], |row| {
                Ok(ManifestEntry {
                    relative_path: row.get(0)?,
                    file_id: row.get(1)?,
                })
            })
            .map_err(not_readable)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(not_readable)?;

        tracing::debug!(
            "[Manifest] 从 {:?} 读取 {} 个 {} 文件",
            manifest_path,
            entries.len(),
            domain
        );

        Ok(Self::from_entries(root, entries))
    }

    /// 由已加载的条目构建索引（逻辑路径重复时保留第一条）
    pub fn from_entries(root: impl Into<PathBuf>, entries: Vec<ManifestEntry>) -> Self {
        let mut by_path = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_path.entry(entry.relative_path.clone()).or_insert(idx);
        }
        Self {
            root: root.into(),
            entries,
            by_path,
        }
    }

    /// 备份根目录
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 清单条目数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 内容哈希对应的物理文件：前两位作为子目录
    pub fn file_by_id(&self, file_id: &str) -> PathBuf {
        let prefix = file_id.get(..2).unwrap_or(file_id);
        self.root.join(prefix).join(file_id)
    }

    /// 逻辑路径 -> 物理文件
    pub fn resolve(&self, relative_path: &str) -> Result<PathBuf, BackupError> {
        self.by_path
            .get(relative_path)
            .map(|&idx| self.file_by_id(&self.entries[idx].file_id))
            .ok_or_else(|| BackupError::NotFound(relative_path.to_string()))
    }

    /// 按正则查找逻辑路径（清单顺序）
    pub fn find_by_pattern(&self, pattern: &Regex) -> Vec<&str> {
        self.entries
            .iter()
            .map(|e| e.relative_path.as_str())
            .filter(|p| pattern.is_match(p))
            .collect()
    }
}
