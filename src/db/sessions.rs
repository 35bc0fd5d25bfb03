//! 会话读取模块
//!
//! 会话库 `session/session.db` 的 `SessionAbstract` 表每个会话一行，
//! 只取统计年度起点之后创建的会话：
//! - `load_sessions`: 定位并读取会话，库缺失或读取失败时返回空列表

use rusqlite::params;
use std::path::Path;

use super::types::SessionRecord;
use super::with_db;
use crate::account::SelfAccount;
use crate::manifest::BackupIndex;
use crate::window::TimeWindow;

/// 读取本人账号在窗口起点之后创建的会话
pub fn load_sessions(
    index: &BackupIndex,
    account: &SelfAccount,
    window: &TimeWindow,
) -> Vec<SessionRecord> {
    let path = match index.resolve(&account.session_db_path()) {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!("[Sessions] {}，会话统计为 0", e);
            return Vec::new();
        }
    };

    match query_sessions(&path, window.start_timestamp()) {
        Ok(sessions) => {
            tracing::debug!("[Sessions] 共 {} 个会话", sessions.len());
            sessions
        }
        Err(e) => {
            tracing::warn!("[Sessions] 读取会话失败 ({:?}): {}", path, e);
            Vec::new()
        }
    }
}

/// 读取会话表
pub fn query_sessions(path: &Path, since: i64) -> rusqlite::Result<Vec<SessionRecord>> {
    with_db(path, |db| {
        let mut stmt = db.prepare(
            "SELECT UsrName, CreateTime
             FROM SessionAbstract
             WHERE CreateTime >= ?1
             ORDER BY rowid",
        )?;

        let sessions = stmt
            .query_map(params![since], |row| {
                Ok(SessionRecord {
                    username: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    create_time: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(sessions)
    })
}
