//! 本地备份目录定位
//!
//! 取系统备份目录下最近访问过的非隐藏子目录：
//! - macOS: `~/Library/Application Support/MobileSync/Backup`
//! - Windows: `%APPDATA%` 或 `%USERPROFILE%` 下的 `Apple[ Computer]/MobileSync/Backup`

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// 当前系统可能的备份根目录
pub fn backup_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();

    if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            roots.push(home.join("Library/Application Support/MobileSync/Backup"));
        }
    } else if cfg!(target_os = "windows") {
        let bases = [dirs::data_dir(), dirs::home_dir()];
        for base in bases.into_iter().flatten() {
            for sub in ["Apple/MobileSync/Backup", "Apple Computer/MobileSync/Backup"] {
                roots.push(base.join(sub));
            }
        }
    }

    roots
}

/// 目录下最近访问过的非隐藏子目录
pub fn latest_backup_in(root: &Path) -> Option<PathBuf> {
    let entries = fs::read_dir(root).ok()?;
    entries
        .flatten()
        .filter(|e| !e.file_name().to_string_lossy().starts_with('.'))
        .filter(|e| e.path().is_dir())
        .map(|e| {
            let accessed = e
                .metadata()
                .and_then(|m| m.accessed().or_else(|_| m.modified()))
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (accessed, e.path())
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, path)| path)
}

/// 定位最近的本地备份
pub fn locate_latest_backup() -> Option<PathBuf> {
    for root in backup_roots() {
        if !root.is_dir() {
            continue;
        }
        tracing::debug!("[BackupDir] 备份根目录: {:?}", root);
        if let Some(backup) = latest_backup_in(&root) {
            return Some(backup);
        }
    }
    None
}
