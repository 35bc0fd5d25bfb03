//! 本人账号模块
//!
//! 备份中每个登录过的账号都有一份设置文件，账号 ID 就是文件名后缀；
//! 账号 ID 的 md5 决定该账号全部数据库所在目录：
//!
//! ```text
//! Documents/
//!   ├── MMappedKV/mmsetting.archive.{账号ID}   # 昵称、头像
//!   └── {md5(账号ID)}/
//!       ├── DB/
//!       │   ├── WCDB_Contact.sqlite          # 联系人
//!       │   └── message_{n}.sqlite           # 消息分片
//!       └── session/session.db               # 会话
//! ```

use md5::{Digest, Md5};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::blob::{scan_self_headimg, scan_self_name};
use crate::manifest::{BackupError, BackupIndex};

/// 账号设置文件
static SETTINGS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Documents/MMappedKV/mmsetting\.archive\.[0-9A-Za-z_\-]{6,20}$")
        .expect("settings regex")
});

// ============================================================================
// 账号信息
// ============================================================================

/// 本人账号
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelfAccount {
    /// 账号 ID
    pub id: String,
    /// md5(账号 ID)，数据目录名
    pub md5: String,
    /// 昵称
    pub name: String,
    /// 头像 URL
    pub headimg: String,
}

/// 账号 ID 的 md5（小写十六进制）
pub fn username_md5(username: &str) -> String {
    hex::encode(Md5::digest(username.as_bytes()))
}

impl SelfAccount {
    /// 从清单中找到本人账号并解析昵称、头像
    ///
    /// 找不到设置文件是致命错误；设置文件读不出昵称或头像时使用默认身份。
    pub fn discover(index: &BackupIndex, fallback_name: &str) -> Result<Self, BackupError> {
        let settings_path = index
            .find_by_pattern(&SETTINGS_RE)
            .first()
            .map(|p| p.to_string())
            .ok_or_else(|| {
                BackupError::NotFound("Documents/MMappedKV/mmsetting.archive.*".to_string())
            })?;

        let id = settings_path
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();
        let md5 = username_md5(&id);
        tracing::debug!("[Account] 本人账号: {} ({})", id, md5);

        let (name, headimg) = match read_identity(index, &settings_path) {
            Ok(identity) => identity,
            Err(reason) => {
                tracing::warn!("[Account] 解析本人信息失败: {}，使用默认身份", reason);
                (fallback_name.to_string(), String::new())
            }
        };

        Ok(Self {
            id,
            md5,
            name,
            headimg,
        })
    }

    /// 联系人数据库
    pub fn contact_db_path(&self) -> String {
        format!("Documents/{}/DB/WCDB_Contact.sqlite", self.md5)
    }

    /// 会话数据库
    pub fn session_db_path(&self) -> String {
        format!("Documents/{}/session/session.db", self.md5)
    }

    /// 消息分片的路径模式
    pub fn message_shard_pattern(&self) -> Result<Regex, regex::Error> {
        Regex::new(&format!(
            r"^Documents/{}/DB/message_\d+\.sqlite$",
            regex::escape(&self.md5)
        ))
    }
}

/// 读取设置文件中的昵称和头像，两者都解析成功才采用
fn read_identity(index: &BackupIndex, settings_path: &str) -> Result<(String, String), String> {
    let file = index.resolve(settings_path).map_err(|e| e.to_string())?;
    let bytes = fs::read(&file).map_err(|e| format!("读取 {:?} 失败: {}", file, e))?;

    let name = scan_self_name(&bytes)
        .ok()
        .ok_or_else(|| "未找到昵称".to_string())?;
    let headimg = scan_self_headimg(&bytes)
        .ok()
        .ok_or_else(|| "未找到头像".to_string())?;

    Ok((name, headimg))
}
