//! 好友和群组读取
//!
//! 从 `WCDB_Contact.sqlite` 的 `Friend` 表中筛出好友和群聊，并解析各自的
//! 二进制字段：
//!
//! - 好友：`type` 为奇数且 `dbContactEncryptSecret` 非空
//! - 群聊：`userName` 以 `@chatroom` 结尾
//!
//! 单行解析失败只影响该行（记录警告），不会中断整张表。

use rusqlite::types::ValueRef;
use rusqlite::Row;
use std::path::{Path, PathBuf};

use super::types::{Contact, ContactExtra, ContactTable, CHAT_TABLE_PREFIX};
use super::with_db;
use crate::account::{username_md5, SelfAccount};
use crate::blob::{
    decode_remark_fields, scan_chatroom, scan_founder, scan_gender, scan_headimg, Field,
    RemarkFields,
};
use crate::manifest::{BackupError, BackupIndex};

/// 联系人表中的一行原始数据
#[derive(Debug, Clone, Default)]
pub struct ContactRow {
    pub username: String,
    pub contact_type: i64,
    pub remark: Option<Vec<u8>>,
    pub head_image: Option<Vec<u8>>,
    pub profile: Option<Vec<u8>>,
    pub chatroom: Option<Vec<u8>>,
}

/// 联系人消息表名
pub fn chat_table_name(username: &str) -> String {
    format!("{}{}", CHAT_TABLE_PREFIX, username_md5(username))
}

/// 读取 blob 列（兼容被写成 TEXT 的旧数据）
pub(crate) fn blob_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<Vec<u8>>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Blob(b) | ValueRef::Text(b) => Some(b.to_vec()),
        _ => None,
    })
}

// ============================================================================
// 行解析
// ============================================================================

/// 解码备注，损坏时降级为空备注
fn remark_of(row: &ContactRow) -> RemarkFields {
    let Some(blob) = row.remark.as_deref() else {
        return RemarkFields::default();
    };
    match decode_remark_fields(blob) {
        Ok(fields) => fields,
        Err(e) => {
            tracing::warn!("[Contacts] {} 备注解析失败: {}", row.username, e);
            RemarkFields::default()
        }
    }
}

/// 可选 blob 上的扫描，损坏时记录警告
fn scan_opt<T>(
    username: &str,
    what: &str,
    blob: Option<&[u8]>,
    scan: impl Fn(&[u8]) -> Field<T>,
) -> Option<T> {
    let field = blob.map(scan).unwrap_or(Field::Absent);
    if field.is_malformed() {
        tracing::warn!("[Contacts] {} 的 {} 字段无法解码", username, what);
    }
    field.ok()
}

/// 原始行 -> 好友
pub fn friend_from_row(row: ContactRow) -> Contact {
    let remark = remark_of(&row);
    let headimg = scan_opt(&row.username, "头像", row.head_image.as_deref(), scan_headimg);
    let gender = scan_opt(&row.username, "性别", row.profile.as_deref(), scan_gender)
        .unwrap_or_default();

    Contact {
        table: chat_table_name(&row.username),
        username: row.username,
        contact_type: row.contact_type,
        remark,
        headimg,
        extra: ContactExtra::Friend { gender },
    }
}

/// 原始行 -> 群聊
pub fn group_from_row(row: ContactRow) -> Contact {
    let remark = remark_of(&row);
    let founder = scan_opt(&row.username, "群主", row.chatroom.as_deref(), scan_founder);
    let chatroom = scan_opt(&row.username, "群成员", row.chatroom.as_deref(), scan_chatroom);

    Contact {
        table: chat_table_name(&row.username),
        username: row.username,
        contact_type: row.contact_type,
        remark,
        headimg: None,
        extra: ContactExtra::Group { founder, chatroom },
    }
}

// ============================================================================
// 联系人库
// ============================================================================

const FRIENDS_SQL: &str = "SELECT userName, type, dbContactRemark, dbContactHeadImage, dbContactProfile
     FROM Friend
     WHERE type % 2 = 1 AND dbContactEncryptSecret NOT NULL
     ORDER BY userName";

const GROUPS_SQL: &str = "SELECT userName, type, dbContactRemark, dbContactChatRoom
     FROM Friend
     WHERE userName LIKE '%@chatroom'
     ORDER BY userName";

/// 联系人库
#[derive(Debug, Clone)]
pub struct ContactRepository {
    db_path: PathBuf,
}

impl ContactRepository {
    /// 定位本人账号的联系人库（必需文件，缺失即失败）
    pub fn locate(index: &BackupIndex, account: &SelfAccount) -> Result<Self, BackupError> {
        Ok(Self::from_path(index.resolve(&account.contact_db_path())?))
    }

    pub fn from_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// 读取好友表
    pub fn load_friends(&self) -> rusqlite::Result<ContactTable> {
        tracing::debug!("[Contacts] 解析好友");
        let rows = self.query_rows(FRIENDS_SQL, |row| {
            Ok(ContactRow {
                username: row.get(0)?,
                contact_type: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                remark: blob_column(row, 2)?,
                head_image: blob_column(row, 3)?,
                profile: blob_column(row, 4)?,
                chatroom: None,
            })
        })?;

        let friends: ContactTable = rows
            .into_iter()
            .map(friend_from_row)
            .map(|c| (c.username.clone(), c))
            .collect();
        tracing::debug!("[Contacts] 共 {} 个好友", friends.len());
        Ok(friends)
    }

    /// 读取群聊表
    pub fn load_groups(&self) -> rusqlite::Result<ContactTable> {
        tracing::debug!("[Contacts] 解析群聊");
        let rows = self.query_rows(GROUPS_SQL, |row| {
            Ok(ContactRow {
                username: row.get(0)?,
                contact_type: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
                remark: blob_column(row, 2)?,
                head_image: None,
                profile: None,
                chatroom: blob_column(row, 3)?,
            })
        })?;

        let groups: ContactTable = rows
            .into_iter()
            .map(group_from_row)
            .map(|c| (c.username.clone(), c))
            .collect();
        tracing::debug!("[Contacts] 共 {} 个群聊", groups.len());
        Ok(groups)
    }

    /// 执行查询；单行读取失败跳过该行
    fn query_rows<F>(&self, sql: &str, map: F) -> rusqlite::Result<Vec<ContactRow>>
    where
        F: FnMut(&Row<'_>) -> rusqlite::Result<ContactRow>,
    {
        with_db(&self.db_path, |db| {
            let mut stmt = db.prepare(sql)?;
            let rows = stmt
                .query_map([], map)?
                .filter_map(|row| match row {
                    Ok(row) => Some(row),
                    Err(e) => {
                        tracing::warn!("[Contacts] 跳过无法读取的联系人: {}", e);
                        None
                    }
                })
                .collect();
            Ok(rows)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{encode_remark, Gender};

    #[test]
    fn test_chat_table_name() {
        assert_eq!(
            chat_table_name("abc"),
            "Chat_900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_friend_from_row() {
        let contact = friend_from_row(ContactRow {
            username: "wxid_a".to_string(),
            contact_type: 3,
            remark: Some(encode_remark([(10, "阿甲"), (26, "A")]).unwrap()),
            head_image: Some(b"\x12\x30http://wx.qlogo.cn/mmhead/ver_1/abc/132".to_vec()),
            profile: Some(b"\x08\x02\x10\x00".to_vec()),
            chatroom: None,
        });
        assert_eq!(contact.display_name(), "阿甲");
        assert_eq!(contact.remark.alias(), Some("A"));
        assert_eq!(
            contact.headimg.as_deref(),
            Some("http://wx.qlogo.cn/mmhead/ver_1/abc/132")
        );
        assert_eq!(contact.gender(), Some(Gender::Female));
        assert_eq!(contact.table, chat_table_name("wxid_a"));
    }

    #[test]
    fn test_broken_remark_keeps_contact() {
        let contact = friend_from_row(ContactRow {
            username: "wxid_b".to_string(),
            contact_type: 1,
            remark: Some(vec![10, 50, b'x']),
            ..Default::default()
        });
        assert!(contact.remark.is_empty());
        assert_eq!(contact.display_name(), "wxid_b");
        assert_eq!(contact.headimg, None);
        assert_eq!(contact.gender(), Some(Gender::Unknown));
    }

    #[test]
    fn test_group_from_row() {
        let mut blob = b"\x0a\x02xx\x12\x0bwxid_owner1".to_vec();
        blob.extend_from_slice(b"\x1a\x40<RoomData><Member UserName=\"wxid_owner1\"></Member></RoomData>");
        let contact = group_from_row(ContactRow {
            username: "123@chatroom".to_string(),
            contact_type: 2,
            remark: Some(encode_remark([(10, "家人群")]).unwrap()),
            chatroom: Some(blob),
            ..Default::default()
        });
        assert_eq!(contact.display_name(), "家人群");
        assert_eq!(contact.founder(), Some("wxid_owner1"));
        assert_eq!(
            contact.chatroom(),
            Some("<RoomData><Member UserName=\"wxid_owner1\"></Member></RoomData>")
        );
    }

    #[test]
    fn test_load_from_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("WCDB_Contact.sqlite");
        let conn = rusqlite::Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE Friend (
                userName TEXT, type INTEGER, dbContactRemark BLOB, dbContactHeadImage BLOB,
                dbContactProfile BLOB, dbContactChatRoom BLOB, dbContactEncryptSecret BLOB
            );
            INSERT INTO Friend (userName, type, dbContactEncryptSecret) VALUES
                ('wxid_odd', 1, x'00'),
                ('wxid_even', 2, x'00'),
                ('wxid_nosecret', 3, NULL);
            INSERT INTO Friend (userName, type, dbContactChatRoom) VALUES
                ('123@chatroom', 2, x'120b777869645f6f776e657231');",
        )
        .unwrap();
        drop(conn);

        let repo = ContactRepository::from_path(&path);
        assert_eq!(repo.db_path(), path.as_path());

        let friends = repo.load_friends().unwrap();
        assert_eq!(friends.keys().collect::<Vec<_>>(), vec!["wxid_odd"]);

        let groups = repo.load_groups().unwrap();
        assert_eq!(groups["123@chatroom"].founder(), Some("wxid_owner1"));
    }

    use proptest::prelude::*;

    proptest! {
        /// 备注被截断在记录中间：联系人仍然保留，备注为空
        #[test]
        fn prop_truncated_remark_keeps_contact(
            nickname in "\\PC{1,40}",
            alias in "\\PC{0,40}",
            cut in any::<prop::sample::Index>(),
        ) {
            let blob = encode_remark([(10, nickname.as_str()), (26, alias.as_str())]).unwrap();
            let first_end = 2 + nickname.len();
            // 不含 0 与两条记录的边界
            let cuts: Vec<usize> = (1..blob.len()).filter(|&n| n != first_end).collect();
            let cut = cuts[cut.index(cuts.len())];

            let contact = friend_from_row(ContactRow {
                username: "wxid_cut".to_string(),
                contact_type: 1,
                remark: Some(blob[..cut].to_vec()),
                ..Default::default()
            });
            prop_assert!(contact.remark.is_empty());
            prop_assert_eq!(contact.display_name(), "wxid_cut");
        }
    }
}
