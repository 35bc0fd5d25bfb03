//! 集成测试用的合成备份
//!
//! 按真实备份的布局生成文件：`Manifest.db` + `{fileID[0..2]}/{fileID}`。

#![allow(dead_code)]

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use rusqlite::{params, Connection};
use std::fs;
use std::path::{Path, PathBuf};

use wechat_annual_lib::account::username_md5;
use wechat_annual_lib::blob::encode_remark;
use wechat_annual_lib::db::chat_table_name;

pub const DOMAIN: &str = "AppDomain-com.tencent.xin";
pub const ME: &str = "wxid_me1234";
pub const FRIEND_A: &str = "wxid_friend_a";
pub const FRIEND_B: &str = "wxid_friend_b";
pub const GROUP: &str = "family@chatroom";

/// 2024 年 1 月运行，统计 2023 年
pub fn run_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|d| d.and_hms_opt(12, 0, 0))
        .unwrap()
}

/// 本地时间中午的时间戳
pub fn ts(year: i32, month: u32, day: u32) -> i64 {
    Local
        .with_ymd_and_hms(year, month, day, 12, 0, 0)
        .single()
        .unwrap()
        .timestamp()
}

// ============================================================================
// 备份构造
// ============================================================================

pub struct BackupBuilder {
    root: PathBuf,
    entries: Vec<(String, String, String, i64)>,
}

impl BackupBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            entries: Vec::new(),
        }
    }

    /// 登记一个文件并返回其物理路径（父目录已创建）
    pub fn add_file(&mut self, relative_path: &str) -> PathBuf {
        self.add_entry(DOMAIN, relative_path, 1)
    }

    pub fn add_entry(&mut self, domain: &str, relative_path: &str, flags: i64) -> PathBuf {
        let file_id = username_md5(&format!("{}-{}", domain, relative_path));
        let dir = self.root.join(&file_id[..2]);
        fs::create_dir_all(&dir).unwrap();
        self.entries.push((
            domain.to_string(),
            relative_path.to_string(),
            file_id.clone(),
            flags,
        ));
        dir.join(file_id)
    }

    /// 写出 Manifest.db
    pub fn finish(self) -> PathBuf {
        let conn = Connection::open(self.root.join("Manifest.db")).unwrap();
        conn.execute_batch(
            "CREATE TABLE Files (
                fileID TEXT PRIMARY KEY,
                domain TEXT,
                relativePath TEXT,
                flags INTEGER,
                file BLOB
            );",
        )
        .unwrap();
        for (domain, path, id, flags) in &self.entries {
            conn.execute(
                "INSERT INTO Files (fileID, domain, relativePath, flags) VALUES (?1, ?2, ?3, ?4)",
                params![id, domain, path, flags],
            )
            .unwrap();
        }
        self.root
    }
}

// ============================================================================
// 各个数据库
// ============================================================================

pub fn settings_path() -> String {
    format!("Documents/MMappedKV/mmsetting.archive.{}", ME)
}

pub fn account_dir() -> String {
    format!("Documents/{}", username_md5(ME))
}

pub fn write_settings(path: &Path) {
    let mut bytes = b"\x00\x0288\x0a\x12".to_vec();
    bytes.extend_from_slice("小王".as_bytes());
    bytes.extend_from_slice(b"\x01\x00\x00headimgurl\x00\x2ehttps://wx.qlogo.cn/mmhead/ver_1/me/132\n");
    fs::write(path, bytes).unwrap();
}

pub fn write_contacts(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Friend (
            userName TEXT,
            type INTEGER,
            dbContactRemark BLOB,
            dbContactHeadImage BLOB,
            dbContactProfile BLOB,
            dbContactChatRoom BLOB,
            dbContactEncryptSecret BLOB
        );",
    )
    .unwrap();

    let insert = "INSERT INTO Friend VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)";
    let secret: Option<Vec<u8>> = Some(b"v3_secret".to_vec());
    let none: Option<Vec<u8>> = None;

    conn.execute(
        insert,
        params![
            FRIEND_A,
            3,
            encode_remark([(10, "阿甲"), (26, "jia")]).unwrap(),
            b"\x12\x30http://wx.qlogo.cn/mmhead/ver_1/aaa/132".to_vec(),
            b"\x08\x01".to_vec(),
            none,
            secret
        ],
    )
    .unwrap();
    conn.execute(
        insert,
        params![FRIEND_B, 1, none, none, none, none, secret],
    )
    .unwrap();
    // 没有密钥：不是好友
    conn.execute(
        insert,
        params!["wxid_stranger", 1, none, none, none, none, none],
    )
    .unwrap();
    // 偶数类型：不是好友
    conn.execute(
        insert,
        params!["wxid_even", 2, none, none, none, none, secret],
    )
    .unwrap();

    let mut room = b"\x0a\x02xx\x12\x0bwxid_owner1\x1a\x00".to_vec();
    room.extend_from_slice(
        b"<RoomData><Member UserName=\"wxid_friend_a\"></Member><Member UserName=\"wxid_x1\"></Member><Member UserName=\"wxid_x2\"></Member></RoomData>",
    );
    conn.execute(
        insert,
        params![
            GROUP,
            2,
            encode_remark([(10, "家人群")]).unwrap(),
            none,
            none,
            room,
            none
        ],
    )
    .unwrap();
}

/// 一条消息：(时间, Des, Type, 内容, MesSvrID)
pub type Row = (i64, i64, i64, &'static str, i64);

/// 写一个消息分片，`tables` 为 (联系人, 消息)
pub fn write_shard(path: &Path, tables: &[(&str, Vec<Row>)]) {
    let conn = Connection::open(path).unwrap();
    for (owner, rows) in tables {
        let table = chat_table_name(owner);
        conn.execute_batch(&format!(
            "CREATE TABLE {table} (
                TableVer INTEGER PRIMARY KEY AUTOINCREMENT,
                MesLocalID INTEGER,
                MesSvrID INTEGER,
                CreateTime INTEGER,
                Message TEXT,
                Status INTEGER,
                ImgStatus INTEGER,
                Type INTEGER,
                Des INTEGER
            );"
        ))
        .unwrap();
        for (create_time, des, msg_type, message, svr_id) in rows {
            conn.execute(
                &format!(
                    "INSERT INTO {table} (MesSvrID, CreateTime, Message, Type, Des)
                     VALUES (?1, ?2, ?3, ?4, ?5)"
                ),
                params![svr_id, create_time, message, msg_type, des],
            )
            .unwrap();
        }
        // 空表不会出现在 sqlite_sequence 中
        if rows.is_empty() {
            conn.execute(
                "INSERT INTO sqlite_sequence (name, seq) VALUES (?1, 0)",
                params![table],
            )
            .unwrap();
        }
    }
}

pub fn write_sessions(path: &Path, sessions: &[(&str, i64)]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch("CREATE TABLE SessionAbstract (UsrName TEXT, CreateTime INTEGER, unreadCount INTEGER);")
        .unwrap();
    for (name, create_time) in sessions {
        conn.execute(
            "INSERT INTO SessionAbstract (UsrName, CreateTime, unreadCount) VALUES (?1, ?2, 0)",
            params![name, create_time],
        )
        .unwrap();
    }
}

// ============================================================================
// 标准场景
// ============================================================================

pub const CLIP_TEXT: &str = "今天天气真不错我们出去玩吧";
pub const STICKER: &str =
    r#"<msg><emoji fromusername="wxid_me1234" md5="abc123" cdnurl="http://emoji.qq.com/abc" /></msg>"#;

pub fn friend_a_rows() -> Vec<Row> {
    vec![
        (ts(2022, 12, 30), 0, 1, "去年的消息", 11),
        (ts(2023, 3, 1), 0, 1, "你好呀", 12),
        (ts(2023, 3, 2), 1, 1, CLIP_TEXT, 13),
        (ts(2023, 3, 3), 0, 47, STICKER, 14),
        (ts(2023, 3, 3), 1, 10000, "你已添加了阿甲，现在可以开始聊天了。", 0),
        (ts(2024, 1, 2), 1, 1, "新年的消息", 15),
    ]
}

pub fn friend_b_rows() -> Vec<Row> {
    vec![
        (ts(2023, 5, 1), 1, 1, "short", 21),
        (ts(2023, 5, 1), 0, 47, STICKER, 22),
    ]
}

pub fn group_rows() -> Vec<Row> {
    vec![
        (
            ts(2023, 4, 1),
            1,
            10002,
            r#"<sysmsg type="sysmsgtemplate"><template>"$username$"邀请你和"$others$"加入了群聊</template></sysmsg>"#,
            31,
        ),
        (ts(2023, 4, 2), 0, 1, "大家好", 32),
        (ts(2023, 4, 2), 1, 1, "wxid_x1:\n欢迎欢迎", 33),
    ]
}

/// 完整备份：两个分片、一个会话库。`corrupt_shard_one` 时第一个分片写成乱码
pub fn sample_backup(root: &Path, corrupt_shard_one: bool) -> PathBuf {
    let mut builder = BackupBuilder::new(root);

    write_settings(&builder.add_file(&settings_path()));
    write_contacts(&builder.add_file(&format!("{}/DB/WCDB_Contact.sqlite", account_dir())));

    let shard_one = builder.add_file(&format!("{}/DB/message_1.sqlite", account_dir()));
    if corrupt_shard_one {
        fs::write(&shard_one, b"this file is not a sqlite database at all").unwrap();
    } else {
        write_shard(&shard_one, &[(FRIEND_A, friend_a_rows()), (GROUP, group_rows())]);
    }
    write_shard(
        &builder.add_file(&format!("{}/DB/message_2.sqlite", account_dir())),
        &[(FRIEND_B, friend_b_rows()), ("wxid_stranger", Vec::new())],
    );

    write_sessions(
        &builder.add_file(&format!("{}/session/session.db", account_dir())),
        &[
            (FRIEND_A, ts(2023, 3, 1)),
            (GROUP, ts(2023, 4, 1)),
            ("wxid_stranger", ts(2023, 6, 1)),
            (FRIEND_B, ts(2022, 6, 1)),
        ],
    );

    // 其他应用域、目录条目都不应进入索引
    builder.add_entry("HomeDomain", &settings_path(), 1);
    builder.add_entry(DOMAIN, "Documents/MMappedKV", 2);

    builder.finish()
}
