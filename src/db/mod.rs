//! 备份数据库读取模块
//!
//! 使用 rusqlite 只读打开备份中的各个 SQLite 文件
//!
//! ## 模块结构
//!
//! - `types`: 数据类型定义（Contact, MessageRecord, SessionRecord）
//! - `contacts`: 联系人库（好友、群聊，含二进制字段解析）
//! - `messages`: 消息分片（表名映射、按年度窗口取消息）
//! - `sessions`: 会话库
//!
//! ## 连接管理
//!
//! 每次读取都在 `with_db` 内打开连接，闭包返回后连接随即释放，
//! 查询失败时同样释放；不保留任何全局连接。

use rusqlite::{Connection, OpenFlags};
use std::path::Path;

// 子模块
pub mod contacts;
pub mod messages;
pub mod sessions;
pub mod types;

// 重新导出类型和函数
pub use contacts::*;
pub use messages::*;
pub use sessions::*;
pub use types::*;

// ============================================================================
// 数据库连接管理
// ============================================================================

/// 只读打开数据库（文件不存在时报错，不会创建新文件）
pub fn open_readonly(path: &Path) -> rusqlite::Result<Connection> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
}

/// 在只读连接上执行一次查询，结束后关闭连接
pub fn with_db<T, F>(path: &Path, f: F) -> rusqlite::Result<T>
where
    F: FnOnce(&Connection) -> rusqlite::Result<T>,
{
    let conn = open_readonly(path)?;
    f(&conn)
}
