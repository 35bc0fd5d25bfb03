//! 联系人备注字段解码
//!
//! `dbContactRemark` 列是一串紧挨着的记录：
//!
//! ```text
//! [tag: u8][len: u8][value: len bytes] [tag][len][value] ...
//! ```
//!
//! 没有记录数也没有校验和，所以长度必须严格对齐：声明长度越过末尾、
//! 或末尾只剩一个 tag 字节时，整条备注视为损坏，由调用方降级为“无备注字段”。

use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TlvError {
    #[error("备注记录损坏: 偏移 {offset} 声明长度 {declared}，剩余 {remaining} 字节")]
    MalformedRecord {
        offset: usize,
        declared: usize,
        remaining: usize,
    },

    #[error("备注值过长: tag {tag} 长度 {len}")]
    ValueTooLong { tag: u8, len: usize },
}

// ============================================================================
// 备注字段名
// ============================================================================

/// 已知的备注 tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RemarkField {
    Nickname,
    IdNew,
    Alias,
    AliasPinyin,
    AliasPy,
    NicknamePinyin,
    Description,
    Tag,
    /// 未知 tag，保留原始数值
    Other(u8),
}

impl RemarkField {
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            10 => RemarkField::Nickname,
            18 => RemarkField::IdNew,
            26 => RemarkField::Alias,
            34 => RemarkField::AliasPinyin,
            42 => RemarkField::AliasPy,
            50 => RemarkField::NicknamePinyin,
            58 => RemarkField::Description,
            66 => RemarkField::Tag,
            other => RemarkField::Other(other),
        }
    }

    pub fn tag(self) -> u8 {
        match self {
            RemarkField::Nickname => 10,
            RemarkField::IdNew => 18,
            RemarkField::Alias => 26,
            RemarkField::AliasPinyin => 34,
            RemarkField::AliasPy => 42,
            RemarkField::NicknamePinyin => 50,
            RemarkField::Description => 58,
            RemarkField::Tag => 66,
            RemarkField::Other(tag) => tag,
        }
    }
}

impl fmt::Display for RemarkField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemarkField::Nickname => f.write_str("nickname"),
            RemarkField::IdNew => f.write_str("id_new"),
            RemarkField::Alias => f.write_str("alias"),
            RemarkField::AliasPinyin => f.write_str("alias_pinyin"),
            RemarkField::AliasPy => f.write_str("alias_PY"),
            RemarkField::NicknamePinyin => f.write_str("nickname_pinyin"),
            RemarkField::Description => f.write_str("description"),
            RemarkField::Tag => f.write_str("tag"),
            RemarkField::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// 解码后的备注字段（tag -> 文本）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemarkFields(BTreeMap<u8, String>);

impl RemarkFields {
    pub fn new(raw: BTreeMap<u8, String>) -> Self {
        Self(raw)
    }

    pub fn get(&self, field: RemarkField) -> Option<&str> {
        self.0.get(&field.tag()).map(String::as_str)
    }

    pub fn nickname(&self) -> Option<&str> {
        self.get(RemarkField::Nickname)
    }

    pub fn alias(&self) -> Option<&str> {
        self.get(RemarkField::Alias)
    }

    pub fn raw(&self) -> &BTreeMap<u8, String> {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (RemarkField, &str)> {
        self.0
            .iter()
            .map(|(tag, v)| (RemarkField::from_tag(*tag), v.as_str()))
    }
}

impl Serialize for RemarkFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (field, value) in self.iter() {
            map.serialize_entry(&field.to_string(), value)?;
        }
        map.end()
    }
}

// ============================================================================
// 编解码
// ============================================================================

/// 解码备注 blob
///
/// 值按 UTF-8 宽松解码（非法字节替换为 U+FFFD）；重复 tag 以最后一次为准。
pub fn decode_remark(blob: &[u8]) -> Result<BTreeMap<u8, String>, TlvError> {
    let mut cursor = 0;
    let mut fields = BTreeMap::new();

    while cursor < blob.len() {
        let tag = blob[cursor];
        // 只剩 tag 字节：长度字节缺失
        let Some(&len) = blob.get(cursor + 1) else {
            return Err(TlvError::MalformedRecord {
                offset: cursor,
                declared: 0,
                remaining: 0,
            });
        };
        let len = len as usize;

        let start = cursor + 2;
        let remaining = blob.len() - start;
        if len > remaining {
            return Err(TlvError::MalformedRecord {
                offset: cursor,
                declared: len,
                remaining,
            });
        }

        let value = String::from_utf8_lossy(&blob[start..start + len]).into_owned();
        fields.insert(tag, value);
        cursor = start + len;
    }

    Ok(fields)
}

/// 解码为带字段名的备注
pub fn decode_remark_fields(blob: &[u8]) -> Result<RemarkFields, TlvError> {
    decode_remark(blob).map(RemarkFields)
}

/// 编码备注 blob（decode_remark 的逆操作）
pub fn encode_remark<'a, I>(fields: I) -> Result<Vec<u8>, TlvError>
where
    I: IntoIterator<Item = (u8, &'a str)>,
{
    let mut out = Vec::new();
    for (tag, value) in fields {
        let bytes = value.as_bytes();
        let len = u8::try_from(bytes.len()).map_err(|_| TlvError::ValueTooLong {
            tag,
            len: bytes.len(),
        })?;
        out.push(tag);
        out.push(len);
        out.extend_from_slice(bytes);
    }
    Ok(out)
}
