//! 时间与 ID 工具
//!
//! 磁盘上的时间戳沿用前台使用的人类可读格式 (`dd/mm/YYYY HH:MM:SS`)，
//! 解析时兼容历史版本写入的几种格式。

use chrono::{Local, NaiveDateTime};

/// Human timestamp format written by every service (`19/10/2026 14:05:09`)
pub const HUMAN_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Date-only format used by search filters (`19/10/2026`)
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Formats accepted when reading timestamps back, newest first
const ACCEPTED_FORMATS: &[&str] = &[
    HUMAN_FORMAT,
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Current local time as a human timestamp
pub fn human_now() -> String {
    Local::now().format(HUMAN_FORMAT).to_string()
}

/// Current local time as `YYYYMMDDHHMMSS`
pub fn compact_now() -> String {
    Local::now().format("%Y%m%d%H%M%S").to_string()
}

/// Parse any timestamp format the data files have ever carried
pub fn parse_human(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ACCEPTED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Unique transaction id: timestamp with microseconds plus a random suffix
pub fn transaction_id() -> String {
    use rand::Rng;
    let suffix: u16 = rand::thread_rng().r#gen();
    format!(
        "{}_{:04x}",
        Local::now().format("%Y%m%d%H%M%S%6f"),
        suffix
    )
}

/// Opaque session id combining type, open timestamp and operator
pub fn session_id(cashier_type: &str, user: &str) -> String {
    let user: String = user
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    format!(
        "{}_{}_{}",
        cashier_type,
        Local::now().format("%Y%m%d%H%M%S%3f"),
        user
    )
}

/// Random document id shared by paired transfer legs
pub fn document_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
