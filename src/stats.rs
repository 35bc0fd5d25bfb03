//! 年度统计模块
//!
//! 由三类消息（本人发出、好友会话、群聊会话）、联系人表和会话列表计算
//! 年度报告。除消息摘录的随机抽样外，全部是输入的纯函数：相同输入
//! 序列化后的报告逐字节相同（排序时以联系人 ID / 表情 md5 兜底）。

use once_cell::sync::Lazy;
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::account::SelfAccount;
use crate::config::ReportConfig;
use crate::db::{is_chatroom, ContactTable, MessageRecord, MessageSets, MessageType, SessionRecord};
use crate::xml::{appmsg_title, emoji_attr, member_usernames};

/// 引用消息标记
const REFER_MARKER: &str = "refermsg";

/// 入群系统消息
static GROUP_JOIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"username.*others").expect("group join regex"));

/// 摘录清洗：`[微笑]` 之类的表情代码和空白
static CLIP_STRIP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\[.{2,4}\])|\s+").expect("clip strip regex"));

// ============================================================================
// 报告结构
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub myself: MyselfStats,
    pub friend: FriendStats,
    pub group: GroupStats,
    pub message_clip: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MyselfStats {
    pub id: String,
    pub name: String,
    pub headimg: String,
    pub active_days: usize,
    pub session: SessionStats,
    pub message: MessageStats,
    pub emoji: Vec<EmojiStat>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub count: usize,
    pub count_friend: usize,
    pub pct_friend: f64,
    pub count_group: usize,
    pub pct_group: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStats {
    pub count: usize,
    pub count_group: usize,
    pub count_friend: usize,
    pub word_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiStat {
    pub count: usize,
    pub chat: usize,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendStats {
    pub new: NewFriends,
    pub top: Vec<TopFriend>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFriends {
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopFriend {
    pub name: String,
    pub headimg: Option<String>,
    pub days: usize,
    pub messages: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub new: NewGroups,
    pub top: Vec<TopGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGroups {
    pub count: usize,
    pub connection: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopGroup {
    pub name: String,
    pub messages: usize,
    pub send: usize,
}

// ============================================================================
// 单项统计
// ============================================================================

/// 比例，分母为 0 时为 0
fn fraction(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// 活跃天数：好友、群聊消息（收发都算）覆盖的本地日期数
pub fn active_days(friend: &[MessageRecord], group: &[MessageRecord]) -> usize {
    friend
        .iter()
        .chain(group)
        .filter_map(MessageRecord::local_date)
        .collect::<HashSet<_>>()
        .len()
}

/// 会话统计
pub fn session_stats(sessions: &[SessionRecord], friends: &ContactTable) -> SessionStats {
    let count = sessions.len();
    let count_group = sessions.iter().filter(|s| is_chatroom(&s.username)).count();
    let count_friend = sessions
        .iter()
        .filter(|s| friends.contains_key(&s.username))
        .count();

    SessionStats {
        count,
        count_friend,
        pct_friend: fraction(count_friend, count),
        count_group,
        pct_group: fraction(count_group, count),
    }
}

/// 本人发出的文字量：纯文本长度 + 引用消息标题长度（按字符计）
pub fn word_count(own: &[MessageRecord]) -> usize {
    own.iter()
        .map(|m| match m.msg_type {
            MessageType::Text => m.payload.trim().chars().count(),
            MessageType::App if m.payload.contains(REFER_MARKER) => appmsg_title(&m.payload)
                .map(|t| t.chars().count())
                .unwrap_or(0),
            _ => 0,
        })
        .sum()
}

/// 本人消息统计
pub fn message_stats(sets: &MessageSets) -> MessageStats {
    MessageStats {
        count: sets.own.len(),
        count_group: sets.group.iter().filter(|m| m.is_sent()).count(),
        count_friend: sets.friend.iter().filter(|m| m.is_sent()).count(),
        word_count: word_count(&sets.own),
    }
}

/// 表情排行：按使用次数、使用过的会话数降序，只保留能找到 URL 的表情
pub fn emoji_ranking(own: &[MessageRecord], limit: usize) -> Vec<EmojiStat> {
    struct Usage<'a> {
        count: usize,
        chats: HashSet<&'a str>,
        url: Option<String>,
    }

    let mut usage: HashMap<String, Usage<'_>> = HashMap::new();
    for m in own.iter().filter(|m| m.msg_type == MessageType::Sticker) {
        let Some(md5) = emoji_attr(&m.payload, "md5") else {
            continue;
        };
        let entry = usage.entry(md5).or_insert_with(|| Usage {
            count: 0,
            chats: HashSet::new(),
            url: None,
        });
        entry.count += 1;
        entry.chats.insert(m.owner.as_str());
        if entry.url.is_none() {
            entry.url = emoji_attr(&m.payload, "cdnurl");
        }
    }

    let mut ranked: Vec<(String, EmojiStat)> = usage
        .into_iter()
        .filter_map(|(md5, u)| {
            let url = u.url?;
            Some((
                md5,
                EmojiStat {
                    count: u.count,
                    chat: u.chats.len(),
                    url,
                },
            ))
        })
        .collect();

    ranked.sort_by(|(a_md5, a), (b_md5, b)| {
        b.count
            .cmp(&a.count)
            .then(b.chat.cmp(&a.chat))
            .then(a_md5.cmp(b_md5))
    });
    ranked.into_iter().take(limit).map(|(_, e)| e).collect()
}

/// 新好友：好友会话中本地生成的系统提示（不含引号的那一类）
pub fn new_friend_count(friend: &[MessageRecord]) -> usize {
    friend
        .iter()
        .filter(|m| m.msg_type == MessageType::SystemNotice)
        .filter(|m| m.server_id == 0 && !m.payload.contains('"'))
        .count()
}

/// 新群聊与新结识的人：入群系统消息数，以及这些群成员的去重人数
pub fn new_group_stats(group: &[MessageRecord], groups: &ContactTable) -> NewGroups {
    let joins: Vec<&MessageRecord> = group
        .iter()
        .filter(|m| m.msg_type == MessageType::SystemXml && GROUP_JOIN_RE.is_match(&m.payload))
        .collect();

    let members: HashSet<String> = joins
        .iter()
        .filter_map(|m| groups.get(&m.owner))
        .filter_map(|g| g.chatroom())
        .flat_map(member_usernames)
        .collect();

    NewGroups {
        count: joins.len(),
        connection: members.len(),
    }
}

/// 好友排行：按聊天天数、消息数降序
pub fn top_friends(friend: &[MessageRecord], friends: &ContactTable, limit: usize) -> Vec<TopFriend> {
    let mut per_friend: HashMap<&str, (usize, BTreeSet<chrono::NaiveDate>)> = HashMap::new();
    for m in friend {
        let entry = per_friend.entry(m.owner.as_str()).or_default();
        entry.0 += 1;
        if let Some(date) = m.local_date() {
            entry.1.insert(date);
        }
    }

    let mut ranked: Vec<(&str, usize, usize)> = per_friend
        .into_iter()
        .map(|(owner, (messages, days))| (owner, days.len(), messages))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(owner, days, messages)| {
            let contact = friends.get(owner);
            TopFriend {
                name: contact
                    .map(|c| c.display_name().to_string())
                    .unwrap_or_else(|| owner.to_string()),
                headimg: contact.and_then(|c| c.headimg.clone()),
                days,
                messages,
            }
        })
        .collect()
}

/// 群聊排行：按总消息数、本人发出数降序
pub fn top_groups(group: &[MessageRecord], groups: &ContactTable, limit: usize) -> Vec<TopGroup> {
    let mut per_group: HashMap<&str, (usize, usize)> = HashMap::new();
    for m in group {
        let entry = per_group.entry(m.owner.as_str()).or_default();
        if m.is_sent() {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let mut ranked: Vec<(&str, usize, usize)> = per_group
        .into_iter()
        .map(|(owner, (send, receive))| (owner, send + receive, send))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(b.2.cmp(&a.2)).then(a.0.cmp(b.0)));

    ranked
        .into_iter()
        .take(limit)
        .map(|(owner, messages, send)| TopGroup {
            name: groups
                .get(owner)
                .map(|c| c.display_name().to_string())
                .unwrap_or_else(|| owner.to_string()),
            messages,
            send,
        })
        .collect()
}

/// 清洗后的消息文本
pub fn strip_clip(text: &str) -> String {
    CLIP_STRIP_RE.replace_all(text, "").into_owned()
}

/// 消息摘录候选：好友发来的纯文本，清洗后长度在区间内
pub fn clip_candidates(friend: &[MessageRecord], config: &ReportConfig) -> Vec<String> {
    friend
        .iter()
        .filter(|m| m.msg_type == MessageType::Text && !m.is_sent())
        .map(|m| strip_clip(&m.payload))
        .filter(|s| config.clip_len_ok(s.chars().count()))
        .collect()
}

/// 随机抽取消息摘录（不放回）
pub fn message_clips<R: Rng + ?Sized>(
    friend: &[MessageRecord],
    config: &ReportConfig,
    rng: &mut R,
) -> Vec<String> {
    let candidates = clip_candidates(friend, config);
    if candidates.len() < config.clip_count {
        tracing::warn!(
            "[Stats] 可用的消息摘录只有 {} 条（需要 {} 条）",
            candidates.len(),
            config.clip_count
        );
    }
    candidates
        .choose_multiple(rng, config.clip_count)
        .cloned()
        .collect()
}

// ============================================================================
// 汇总
// ============================================================================

/// 年度统计
pub struct StatsAggregator<'a> {
    account: &'a SelfAccount,
    config: &'a ReportConfig,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(account: &'a SelfAccount, config: &'a ReportConfig) -> Self {
        Self { account, config }
    }

    /// 计算完整报告
    pub fn aggregate<R: Rng + ?Sized>(
        &self,
        sets: &MessageSets,
        friends: &ContactTable,
        groups: &ContactTable,
        sessions: &[SessionRecord],
        rng: &mut R,
    ) -> StatsReport {
        tracing::debug!("[Stats] 开始统计");
        let config = self.config;

        let report = StatsReport {
            myself: MyselfStats {
                id: self.account.id.clone(),
                name: self.account.name.clone(),
                headimg: self.account.headimg.clone(),
                active_days: active_days(&sets.friend, &sets.group),
                session: session_stats(sessions, friends),
                message: message_stats(sets),
                emoji: emoji_ranking(&sets.own, config.top_emoji),
            },
            friend: FriendStats {
                new: NewFriends {
                    count: new_friend_count(&sets.friend),
                },
                top: top_friends(&sets.friend, friends, config.top_friends),
            },
            group: GroupStats {
                new: new_group_stats(&sets.group, groups),
                top: top_groups(&sets.group, groups, config.top_groups),
            },
            message_clip: message_clips(&sets.friend, config, rng),
        };

        tracing::debug!(
            "[Stats] 活跃 {} 天，发出 {} 条消息",
            report.myself.active_days,
            report.myself.message.count
        );
        report
    }
}
