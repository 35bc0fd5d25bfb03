//! 原始字节模式扫描
//!
//! 头像、资料、群信息这几列的外层格式并不稳定，逐字节解码不可靠，
//! 直接在原始字节上找第一处匹配。每个提取函数只取第一处匹配，
//! 匹配失败返回 `Field::Absent`，匹配到但不是合法 UTF-8 返回 `Field::Malformed`。

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use super::Field;

// ============================================================================
// 模式
// ============================================================================

/// 头像 URL：至少两级路径，最后一段为数字（尺寸）
static HEADIMG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)https?://.*?/.*?/(?:.*?/)?.*?/\d+").expect("headimg regex"));

/// 账号设置文件中的昵称：`88` + 两个控制字节 + 昵称 + `\x01`
static SELF_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)88[\x00-\x2f]{2}(.*?)\x01").expect("self name regex"));

/// 账号设置文件中的头像：`headimgurl` 之后同一行的最后一个 URL
static SELF_HEADIMG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?-u)headimgurl.*(https?://.*?/.*?/(?:.*?/)?.*?/\d+)").expect("self headimg regex")
});

/// 群主：`\x12` + 任意一个字节 + 微信号
static FOUNDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)\x12.([0-9A-Za-z_\-]{6,20})").expect("founder regex"));

/// 群成员 XML
static CHATROOM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)<RoomData>.*</RoomData>").expect("chatroom regex"));

/// 性别：`\x08` + 0/1/2
static GENDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?-u)\x08([\x00-\x02])").expect("gender regex"));

// ============================================================================
// 性别
// ============================================================================

/// 资料中的性别标记
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[default]
    Unknown,
    Male,
    Female,
}

impl Gender {
    pub fn from_flag(flag: u8) -> Self {
        match flag {
            1 => Gender::Male,
            2 => Gender::Female,
            _ => Gender::Unknown,
        }
    }
}

// ============================================================================
// 提取函数
// ============================================================================

/// 第一处匹配（整体或第 1 组）解码为 UTF-8
fn first_text(re: &Regex, blob: &[u8], group: usize) -> Field<String> {
    let Some(caps) = re.captures(blob) else {
        return Field::Absent;
    };
    let Some(m) = caps.get(group) else {
        return Field::Absent;
    };
    match std::str::from_utf8(m.as_bytes()) {
        Ok(s) => Field::Present(s.to_string()),
        Err(_) => Field::Malformed,
    }
}

/// 头像 / 资料图片 URL
pub fn scan_headimg(blob: &[u8]) -> Field<String> {
    first_text(&HEADIMG_RE, blob, 0)
}

/// 本人昵称（账号设置文件）
pub fn scan_self_name(blob: &[u8]) -> Field<String> {
    first_text(&SELF_NAME_RE, blob, 1)
}

/// 本人头像（账号设置文件）
pub fn scan_self_headimg(blob: &[u8]) -> Field<String> {
    first_text(&SELF_HEADIMG_RE, blob, 1)
}

/// 群主微信号
pub fn scan_founder(blob: &[u8]) -> Field<String> {
    first_text(&FOUNDER_RE, blob, 1)
}

/// `<RoomData>...</RoomData>` 片段
pub fn scan_chatroom(blob: &[u8]) -> Field<String> {
    first_text(&CHATROOM_RE, blob, 0)
}

/// 性别
pub fn scan_gender(blob: &[u8]) -> Field<Gender> {
    match GENDER_RE.captures(blob).and_then(|c| c.get(1)) {
        Some(m) => Field::Present(Gender::from_flag(m.as_bytes()[0])),
        None => Field::Absent,
    }
}
