//! 统计年度窗口
//!
//! 1、2 月运行统计上一年，3 月起统计当年。窗口为本地时间的
//! `[当年 1 月 1 日 00:00, 次年 1 月 1 日 00:00)`。

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// 3 月之前仍统计上一年
const CURRENT_YEAR_FROM_MONTH: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub year: i32,
    /// 起点（本地时间，含）
    pub start: NaiveDateTime,
    /// 终点（本地时间，不含）
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// 指定年份的窗口
    pub fn for_year(year: i32) -> Self {
        Self {
            year,
            start: new_year(year),
            end: new_year(year + 1),
        }
    }

    /// 由运行时刻推导窗口
    pub fn from_reference(now: NaiveDateTime) -> Self {
        let year = if now.month() < CURRENT_YEAR_FROM_MONTH {
            now.year() - 1
        } else {
            now.year()
        };
        Self::for_year(year)
    }

    /// 起点的 Unix 时间戳（秒）
    pub fn start_timestamp(&self) -> i64 {
        local_timestamp(self.start)
    }

    /// 终点的 Unix 时间戳（秒）
    pub fn end_timestamp(&self) -> i64 {
        local_timestamp(self.end)
    }

    /// 时间戳是否落在窗口内
    pub fn contains(&self, ts: i64) -> bool {
        ts >= self.start_timestamp() && ts < self.end_timestamp()
    }
}

fn new_year(year: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or(NaiveDateTime::MIN)
}

/// 本地时间 -> 时间戳；夏令时跳变导致不存在的时刻按 UTC 处理
fn local_timestamp(t: NaiveDateTime) -> i64 {
    match Local.from_local_datetime(&t).earliest() {
        Some(dt) => dt.timestamp(),
        None => t.and_utc().timestamp(),
    }
}

/// 时间戳对应的本地日期
pub fn local_date(ts: i64) -> Option<NaiveDate> {
    Local.timestamp_opt(ts, 0).single().map(|dt| dt.date_naive())
}
