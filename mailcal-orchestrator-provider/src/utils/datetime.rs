//! 日期时间解析工具
//!
//! 各后端返回的时间格式不一：
//! - Graph: `2024-05-01T09:00:00.0000000`，时区单独给出（请求时统一要求 UTC）
//! - Google Calendar: RFC3339 `dateTime`，全天事件只有 `date`
//! - Gmail: `internalDate` 毫秒时间戳字符串
//! - JSON 日历文件: RFC3339 字符串、日期或 Unix 时间戳

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// 解析 RFC3339、无时区的 ISO 时间（按 UTC 处理）或纯日期（UTC 零点）
pub fn parse_flexible(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    parse_date(s)
}

/// 解析 `YYYY-MM-DD`，返回当天 UTC 零点
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 解析 Unix 时间戳（自动判断秒/毫秒）
pub fn parse_unix_timestamp(ts: i64) -> Option<DateTime<Utc>> {
    // 大于 10^11 视为毫秒（Gmail internalDate 使用毫秒）
    if ts > 100_000_000_000 {
        DateTime::from_timestamp_millis(ts)
    } else {
        DateTime::from_timestamp(ts, 0)
    }
}

/// Graph 请求体使用的无时区格式（配合 `timeZone: "UTC"`）
pub fn to_graph_datetime(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S").to_string()
}

/// Serde 适配：序列化为 RFC3339，反序列化接受 [`parse_flexible`] 支持的字符串或 Unix 时间戳
pub mod flexible {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc, parse_flexible, parse_unix_timestamp};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Timestamp {
            String(String),
            I64(i64),
        }

        match Timestamp::deserialize(deserializer)? {
            Timestamp::String(s) => parse_flexible(&s)
                .ok_or_else(|| Error::custom(format!("Invalid timestamp: {s}"))),
            Timestamp::I64(ts) => {
                parse_unix_timestamp(ts).ok_or_else(|| Error::custom("Invalid Unix timestamp"))
            }
        }
    }
}

/// [`flexible`] 的可选版本，缺失或 `null` 视为 `None`
pub mod flexible_option {
    use super::{DateTime, Deserialize, Deserializer, Serializer, Utc};

    #[allow(clippy::ref_option)]
    pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => super::flexible::serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "super::flexible")] DateTime<Utc>);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|Wrapper(dt)| dt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn parses_rfc3339_with_offset() {
        let dt = parse_flexible("2024-05-01T09:00:00+02:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap());
    }

    #[test]
    fn parses_graph_naive_datetime_as_utc() {
        let dt = parse_flexible("2024-05-01T09:30:00.0000000").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
    }

    #[test]
    fn parses_plain_date_as_midnight() {
        let dt = parse_flexible("2024-12-25").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 12, 25, 0, 0, 0).unwrap());
        assert!(parse_flexible("next tuesday").is_none());
    }

    #[test]
    fn unix_timestamp_seconds_and_millis() {
        let secs = parse_unix_timestamp(1_700_000_000).unwrap();
        let millis = parse_unix_timestamp(1_700_000_000_000).unwrap();
        assert_eq!(secs, millis);
    }

    #[test]
    fn flexible_serde_accepts_numbers_and_strings() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "flexible")]
            at: DateTime<Utc>,
        }
        let a: Wrapper = serde_json::from_str(r#"{"at":"2024-05-01"}"#).unwrap();
        let b: Wrapper = serde_json::from_str(r#"{"at":1714521600}"#).unwrap();
        assert_eq!(a.at, b.at);
    }

    #[test]
    fn graph_format_has_no_offset() {
        let dt = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        assert_eq!(to_graph_datetime(&dt), "2024-05-01T09:00:00");
    }
}
