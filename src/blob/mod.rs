//! 联系人二进制字段解析
//!
//! 联系人库的 blob 列没有公开格式，这里只提取统计需要的字段：
//!
//! - `tlv`: 备注字段（tag + 单字节长度 + 值）
//! - `scan`: 对原始字节做模式扫描（头像 URL、群主、群成员 XML、性别等）
//!
//! 所有提取都是全函数，失败时返回 `Field::Absent` / `Field::Malformed`，
//! 不会让单个联系人的异常影响整张表。

pub mod scan;
pub mod tlv;

pub use scan::*;
pub use tlv::*;

/// 单个字段的提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// 成功提取
    Present(T),
    /// 没有匹配
    Absent,
    /// 匹配到了，但内容无法解码
    Malformed,
}

impl<T> Field<T> {
    /// 转为 Option（Absent / Malformed 都视为缺失）
    pub fn ok(self) -> Option<T> {
        match self {
            Field::Present(v) => Some(v),
            Field::Absent | Field::Malformed => None,
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Field::Malformed)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Present(v) => Field::Present(f(v)),
            Field::Absent => Field::Absent,
            Field::Malformed => Field::Malformed,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Field::Present(v),
            None => Field::Absent,
        }
    }
}
