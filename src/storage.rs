//! 报告缓存模块
//!
//! 每个账号一份 `{工作目录}/{账号ID}.json`：
//! - 存在时直接读取，不再重新统计
//! - 统计完成后写入（格式化 JSON）
//!
//! 单用户单进程使用，没有并发写入。

use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 存储错误类型
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// 报告缓存
#[derive(Debug, Clone)]
pub struct ReportCache {
    dir: PathBuf,
}

impl ReportCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// 账号对应的缓存文件
    pub fn path_for(&self, account_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_filename(account_id)))
    }

    /// 读取缓存，不存在时返回 None
    pub fn load<T: DeserializeOwned>(&self, account_id: &str) -> Result<Option<T>, StorageError> {
        let path = self.path_for(account_id);
        if !path.is_file() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let value = serde_json::from_str(&content)?;
        tracing::debug!("[Storage] 读取已有报告: {:?}", path);
        Ok(Some(value))
    }

    /// 写入缓存
    pub fn save<T: Serialize>(&self, account_id: &str, value: &T) -> Result<PathBuf, StorageError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }

        let path = self.path_for(account_id);
        let content = serde_json::to_string_pretty(value)?;
        fs::write(&path, content)?;
        tracing::debug!("[Storage] 报告已保存: {:?}", path);
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// 清理文件名中的路径分隔符等字符
fn sanitize_filename(name: &str) -> String {
    name.replace(['/', '\\', ':', '*', '?', '"', '<', '>', '|'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        count: usize,
        name: String,
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("wxid_abc"), "wxid_abc");
        assert_eq!(sanitize_filename("a/b:c"), "a_b_c");
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ReportCache::new(dir.path().join("out"));
        assert_eq!(cache.load::<Sample>("wxid_a").unwrap(), None);

        let sample = Sample {
            count: 3,
            name: "小明".to_string(),
        };
        let path = cache.save("wxid_a", &sample).unwrap();
        assert_eq!(path, dir.path().join("out").join("wxid_a.json"));
        assert_eq!(cache.load::<Sample>("wxid_a").unwrap(), Some(sample));
    }

    #[test]
    fn test_corrupt_cache() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("wxid_a.json"), "{").unwrap();
        let cache = ReportCache::new(dir.path());
        assert!(matches!(
            cache.load::<Sample>("wxid_a"),
            Err(StorageError::Json(_))
        ));
    }
}
