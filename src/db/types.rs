//! 数据类型定义
//!
//! 从备份中还原出的数据结构，包括：
//! - `Contact`: 好友或群聊（按 ID 建表）
//! - `MessageRecord`: 单条消息
//! - `SessionRecord`: 会话摘要
//!
//! 消息只通过 `owner` 引用联系人 ID，不持有联系人本身。

use serde::Serialize;
use std::collections::BTreeMap;

use crate::blob::{Gender, RemarkFields};
use crate::window::local_date;

/// 群聊 ID 后缀
pub const CHATROOM_SUFFIX: &str = "@chatroom";

/// 消息表名前缀
pub const CHAT_TABLE_PREFIX: &str = "Chat_";

/// 是否为群聊 ID
pub fn is_chatroom(username: &str) -> bool {
    username.ends_with(CHATROOM_SUFFIX)
}

// ============================================================================
// 联系人
// ============================================================================

/// 好友 / 群聊各自的附加字段
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ContactExtra {
    Friend {
        gender: Gender,
    },
    Group {
        founder: Option<String>,
        /// `<RoomData>` 原始 XML
        chatroom: Option<String>,
    },
}

/// 联系人记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Contact {
    pub username: String,
    #[serde(rename = "type")]
    pub contact_type: i64,
    pub remark: RemarkFields,
    pub headimg: Option<String>,
    /// 消息表名：Chat_ + md5(username)
    pub table: String,
    #[serde(flatten)]
    pub extra: ContactExtra,
}

impl Contact {
    /// 展示名：备注中的昵称，缺失时用 ID
    pub fn display_name(&self) -> &str {
        self.remark.nickname().unwrap_or(&self.username)
    }

    pub fn founder(&self) -> Option<&str> {
        match &self.extra {
            ContactExtra::Group { founder, .. } => founder.as_deref(),
            ContactExtra::Friend { .. } => None,
        }
    }

    pub fn chatroom(&self) -> Option<&str> {
        match &self.extra {
            ContactExtra::Group { chatroom, .. } => chatroom.as_deref(),
            ContactExtra::Friend { .. } => None,
        }
    }

    pub fn gender(&self) -> Option<Gender> {
        match &self.extra {
            ContactExtra::Friend { gender } => Some(*gender),
            ContactExtra::Group { .. } => None,
        }
    }
}

/// 联系人表（ID -> 联系人）
pub type ContactTable = BTreeMap<String, Contact>;

// ============================================================================
// 消息
// ============================================================================

/// 消息方向（Des 列：0 发出，其余为收到）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

impl Direction {
    pub fn from_des(des: i64) -> Self {
        if des == 0 {
            Direction::Sent
        } else {
            Direction::Received
        }
    }
}

/// 消息类型（Type 列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// 1
    Text,
    /// 47
    Sticker,
    /// 49 卡片 / 分享 / 引用
    App,
    /// 10000 系统提示
    SystemNotice,
    /// 10002 带 XML 的系统消息（入群等）
    SystemXml,
    Other(i64),
}

impl MessageType {
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => MessageType::Text,
            47 => MessageType::Sticker,
            49 => MessageType::App,
            10000 => MessageType::SystemNotice,
            10002 => MessageType::SystemXml,
            other => MessageType::Other(other),
        }
    }

    pub fn code(self) -> i64 {
        match self {
            MessageType::Text => 1,
            MessageType::Sticker => 47,
            MessageType::App => 49,
            MessageType::SystemNotice => 10000,
            MessageType::SystemXml => 10002,
            MessageType::Other(code) => code,
        }
    }
}

/// 单条消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MessageRecord {
    /// 所属会话的联系人 ID
    pub owner: String,
    /// Unix 时间戳（秒）
    pub create_time: i64,
    pub direction: Direction,
    pub msg_type: MessageType,
    /// 文本或 XML
    pub payload: String,
    /// MesSvrID，本地生成的系统消息为 0
    pub server_id: i64,
}

impl MessageRecord {
    pub fn is_sent(&self) -> bool {
        self.direction == Direction::Sent
    }

    pub fn local_date(&self) -> Option<chrono::NaiveDate> {
        local_date(self.create_time)
    }
}

// ============================================================================
// 会话
// ============================================================================

/// 会话摘要
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub username: String,
    pub create_time: i64,
}
