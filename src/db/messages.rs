//! 消息读取模块
//!
//! 消息按联系人分表（`Chat_{md5}`），分散在多个 `message_{n}.sqlite` 分片中：
//! - `MessageRepository::discover`: 读取每个分片的 `sqlite_sequence`，建立表名 -> 分片映射
//! - `messages_for`: 按年度窗口读取单个联系人的消息（时间过滤在 SQL 中完成）
//! - `MessageSets::collect`: 读取全部好友、群聊消息，并拆出本人发出的消息
//!
//! ## 失败处理
//!
//! 分片打不开或表查询失败时只记录警告，相关联系人视为没有消息。

use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Row};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::types::{Contact, ContactTable, Direction, MessageRecord, MessageType};
use super::with_db;
use crate::account::SelfAccount;
use crate::manifest::BackupIndex;
use crate::window::TimeWindow;

/// 合法的消息表名（表名会拼进 SQL）
static TABLE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("table name regex"));

/// 整数列，兼容 TEXT / REAL / NULL
fn int_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<i64> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Integer(v) => v,
        ValueRef::Real(v) => v as i64,
        ValueRef::Text(t) => std::str::from_utf8(t)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0),
        ValueRef::Null | ValueRef::Blob(_) => 0,
    })
}

/// 文本列，NULL 视为空串
fn text_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Integer(v) => v.to_string(),
        ValueRef::Real(v) => v.to_string(),
        ValueRef::Null => String::new(),
    })
}

// ============================================================================
// 分片映射
// ============================================================================

/// 消息库
#[derive(Debug, Clone)]
pub struct MessageRepository {
    /// 表名 -> 分片文件
    tables: HashMap<String, PathBuf>,
    window: TimeWindow,
}

impl MessageRepository {
    /// 从清单中找到本人账号的全部分片并读取各自的表名
    pub fn discover(index: &BackupIndex, account: &SelfAccount, window: TimeWindow) -> Self {
        let pattern = match account.message_shard_pattern() {
            Ok(pattern) => pattern,
            Err(e) => {
                tracing::warn!("[Messages] 消息分片路径模式无效: {}", e);
                return Self::from_shards(&[], window);
            }
        };
        let shards: Vec<PathBuf> = index
            .find_by_pattern(&pattern)
            .into_iter()
            .filter_map(|p| match index.resolve(p) {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("[Messages] {}", e);
                    None
                }
            })
            .collect();
        tracing::debug!("[Messages] 找到 {} 个消息分片", shards.len());
        Self::from_shards(&shards, window)
    }

    /// 由分片文件列表建立映射；同名表以先出现的分片为准
    pub fn from_shards(shards: &[PathBuf], window: TimeWindow) -> Self {
        let mut tables = HashMap::new();
        for shard in shards {
            match list_tables(shard) {
                Ok(names) => {
                    tracing::debug!("[Messages] {:?} 包含 {} 张表", shard, names.len());
                    for name in names {
                        tables.entry(name).or_insert_with(|| shard.clone());
                    }
                }
                Err(e) => tracing::warn!("[Messages] 消息分片 {:?} 无法读取: {}", shard, e),
            }
        }
        Self { tables, window }
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// 表所在的分片
    pub fn shard_for(&self, table: &str) -> Option<&Path> {
        self.tables.get(table).map(PathBuf::as_path)
    }

    /// 已知的表数量
    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    /// 单个联系人在窗口内的消息
    pub fn messages_for(&self, contact: &Contact) -> Vec<MessageRecord> {
        self.messages_for_table(&contact.username, &contact.table)
    }

    /// 按表名读取消息，`owner` 写入每条记录
    pub fn messages_for_table(&self, owner: &str, table: &str) -> Vec<MessageRecord> {
        let Some(shard) = self.shard_for(table) else {
            return Vec::new();
        };
        if !TABLE_NAME_RE.is_match(table) {
            tracing::warn!("[Messages] 非法表名: {}", table);
            return Vec::new();
        }

        match query_table(shard, owner, table, &self.window) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!("[Messages] 读取 {} 的消息失败 ({:?}): {}", owner, shard, e);
                Vec::new()
            }
        }
    }

    /// 一组联系人的全部消息
    pub fn messages_for_all(&self, contacts: &ContactTable) -> Vec<MessageRecord> {
        contacts
            .values()
            .flat_map(|c| self.messages_for(c))
            .collect()
    }
}

/// 分片中的表名
fn list_tables(shard: &Path) -> rusqlite::Result<Vec<String>> {
    with_db(shard, |db| {
        let mut stmt = db.prepare("SELECT name FROM sqlite_sequence")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    })
}

/// 读取单表在窗口内的消息
fn query_table(
    shard: &Path,
    owner: &str,
    table: &str,
    window: &TimeWindow,
) -> rusqlite::Result<Vec<MessageRecord>> {
    let sql = format!(
        "SELECT CreateTime, Des, Type, Message, MesSvrID
         FROM \"{}\"
         WHERE CreateTime >= ?1 AND CreateTime < ?2
         ORDER BY CreateTime",
        table
    );

    with_db(shard, |db| {
        let mut stmt = db.prepare(&sql)?;
        let messages = stmt
            .query_map(
                params![window.start_timestamp(), window.end_timestamp()],
                |row| {
                    Ok(MessageRecord {
                        owner: owner.to_string(),
                        create_time: int_column(row, 0)?,
                        direction: Direction::from_des(int_column(row, 1)?),
                        msg_type: MessageType::from_code(int_column(row, 2)?),
                        payload: text_column(row, 3)?,
                        server_id: int_column(row, 4)?,
                    })
                },
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    })
}

// ============================================================================
// 三类消息集合
// ============================================================================

/// 好友消息、群聊消息、本人发出的消息
#[derive(Debug, Clone, Default)]
pub struct MessageSets {
    pub friend: Vec<MessageRecord>,
    pub group: Vec<MessageRecord>,
    pub own: Vec<MessageRecord>,
}

impl MessageSets {
    /// 读取全部好友、群聊的消息
    pub fn collect(repo: &MessageRepository, friends: &ContactTable, groups: &ContactTable) -> Self {
        tracing::debug!("[Messages] 读取消息");
        let friend = repo.messages_for_all(friends);
        let group = repo.messages_for_all(groups);
        tracing::debug!(
            "[Messages] 好友消息 {} 条，群聊消息 {} 条",
            friend.len(),
            group.len()
        );
        Self::from_parts(friend, group)
    }

    /// 由好友、群聊消息拆出本人发出的消息
    pub fn from_parts(friend: Vec<MessageRecord>, group: Vec<MessageRecord>) -> Self {
        let own = self_messages(&friend, &group);
        Self { friend, group, own }
    }
}

/// 本人发出的消息（好友在前，群聊在后）
pub fn self_messages(friend: &[MessageRecord], group: &[MessageRecord]) -> Vec<MessageRecord> {
    friend
        .iter()
        .chain(group)
        .filter(|m| m.is_sent())
        .cloned()
        .collect()
}
