//! 消息 XML 片段提取
//!
//! 表情、引用消息、群成员列表都以 XML 存在消息或联系人字段里，
//! 格式经常不完整（截断、未转义），这里只做宽松的定位提取：
//! 找不到或值为空都返回 `None`。

use once_cell::sync::Lazy;
use regex::Regex;

/// `<emoji ...>` 起始标签
static EMOJI_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<emoji\b[^>]*>").expect("emoji regex"));

/// `<appmsg ...>` 之后的第一个 `<title>`
static APPMSG_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<appmsg\b[^>]*>.*?<title>(.*?)</title>").expect("appmsg title regex")
});

/// `<Member ...>` 起始标签
static MEMBER_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<Member\b[^>]*>").expect("member regex"));

/// `<Member>...</Member>` 整段
static MEMBER_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<Member\b[^>]*>(.*?)</Member>").expect("member block regex"));

/// 子元素 `<UserName>`
static USERNAME_CHILD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<UserName>([^<]*)</UserName>").expect("username regex"));

/// 标签内的 `name="value"` / `name='value'`
static ATTR_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\s([A-Za-z_:][\w:.\-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attr regex")
});

/// 标签内的属性值
fn attr_value(tag: &str, attr: &str) -> Option<String> {
    ATTR_RE
        .captures_iter(tag)
        .find(|c| &c[1] == attr)
        .and_then(|c| c.get(2).or_else(|| c.get(3)))
        .and_then(|m| non_empty(unescape(m.as_str())))
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() { None } else { Some(s) }
}

/// 反转义常见实体
pub fn unescape(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// 表情消息中的属性（md5 / cdnurl）
pub fn emoji_attr(msg: &str, attr: &str) -> Option<String> {
    let tag = EMOJI_TAG_RE.find(msg)?;
    attr_value(tag.as_str(), attr)
}

/// 卡片消息 `appmsg/title`
pub fn appmsg_title(msg: &str) -> Option<String> {
    let raw = APPMSG_TITLE_RE.captures(msg)?.get(1)?.as_str();
    if let Some(inner) = raw
        .trim()
        .strip_prefix("<![CDATA[")
        .and_then(|t| t.strip_suffix("]]>"))
    {
        return non_empty(inner.to_string());
    }
    non_empty(unescape(raw))
}

/// 群成员列表中的全部成员 ID（保持出现顺序）
///
/// 成员 ID 一般是 `<Member UserName="...">` 属性，旧版本写成子元素。
pub fn member_usernames(room_data: &str) -> Vec<String> {
    let members: Vec<String> = MEMBER_TAG_RE
        .find_iter(room_data)
        .filter_map(|m| attr_value(m.as_str(), "UserName"))
        .collect();
    if !members.is_empty() {
        return members;
    }

    MEMBER_BLOCK_RE
        .captures_iter(room_data)
        .filter_map(|block| {
            USERNAME_CHILD_RE
                .captures(block.get(1)?.as_str())
                .and_then(|c| non_empty(unescape(c[1].trim())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emoji_attrs() {
        let msg = r#"<msg><emoji fromusername="a" md5="abc123" cdnurl="http://emoji.qpic.cn/wx_emoji/x/?a=1&amp;b=2" len="10"></emoji></msg>"#;
        assert_eq!(emoji_attr(msg, "md5").as_deref(), Some("abc123"));
        assert_eq!(
            emoji_attr(msg, "cdnurl").as_deref(),
            Some("http://emoji.qpic.cn/wx_emoji/x/?a=1&b=2")
        );
        assert_eq!(emoji_attr(msg, "missing"), None);
        assert_eq!(emoji_attr(r#"<msg><emoji md5=""/></msg>"#, "md5"), None);
        assert_eq!(emoji_attr("not xml", "md5"), None);
    }

    #[test]
    fn test_attr_does_not_match_suffix() {
        let msg = r#"<emoji externmd5="zzz" md5='real'>"#;
        assert_eq!(emoji_attr(msg, "md5").as_deref(), Some("real"));
    }

    #[test]
    fn test_appmsg_title() {
        let msg = "<msg><appmsg appid=\"\"><title>好的 收到</title><type>57</type>\
                   <refermsg><type>1</type><content>hi</content></refermsg></appmsg></msg>";
        assert_eq!(appmsg_title(msg).as_deref(), Some("好的 收到"));
        assert_eq!(
            appmsg_title("<msg><appmsg><title><![CDATA[a&b]]></title></appmsg></msg>").as_deref(),
            Some("a&b")
        );
        assert_eq!(appmsg_title("<msg><appmsg><title></title></appmsg></msg>"), None);
        assert_eq!(appmsg_title("<msg><title>x</title></msg>"), None);
    }

    #[test]
    fn test_member_usernames() {
        let xml = r#"<RoomData><Member UserName="wxid_a" ><DisplayName>A</DisplayName></Member><Member UserName="wxid_b"/></RoomData>"#;
        assert_eq!(member_usernames(xml), vec!["wxid_a", "wxid_b"]);

        let nested = "<RoomData><Member><UserName>wxid_c</UserName></Member></RoomData>";
        assert_eq!(member_usernames(nested), vec!["wxid_c"]);

        assert!(member_usernames("<RoomData></RoomData>").is_empty());
    }
}
