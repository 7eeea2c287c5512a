//! 报文时间戳解析：epoch 秒或 ISO-8601 字符串 → UTC 时间点。

use crate::DecodeError;
use chrono::{DateTime, LocalResult, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// 解析时间戳。
///
/// - 数字：epoch 秒（允许小数部分）
/// - 带偏移量的字符串：按自身偏移量换算
/// - 不带偏移量的字符串：按 `timezone` 本地化；夏令时回拨产生的歧义取较早时刻，
///   夏令时跳变中不存在的本地时间视为错误
///
/// 结果必须落在 i64 纳秒可表示的范围内（约 1677 年至 2262 年），否则存储端必然拒绝。
pub(crate) fn parse_timestamp(value: &Value, timezone: Tz) -> Result<DateTime<Utc>, DecodeError> {
    let parsed = parse_instant(value, timezone)?;
    if parsed.timestamp_nanos_opt().is_none() {
        return Err(DecodeError::InvalidTimestamp(format!(
            "{} is outside the storable range",
            value
        )));
    }
    Ok(parsed)
}

fn parse_instant(value: &Value, timezone: Tz) -> Result<DateTime<Utc>, DecodeError> {
    match value {
        Value::Number(number) => {
            if let Some(secs) = number.as_i64() {
                return DateTime::from_timestamp(secs, 0)
                    .ok_or_else(|| DecodeError::InvalidTimestamp(number.to_string()));
            }
            let secs = number
                .as_f64()
                .filter(|secs| secs.is_finite())
                .ok_or_else(|| DecodeError::InvalidTimestamp(number.to_string()))?;
            from_fractional_secs(secs)
                .ok_or_else(|| DecodeError::InvalidTimestamp(number.to_string()))
        }
        Value::String(text) => parse_text(text.trim(), timezone),
        other => Err(DecodeError::InvalidTimestamp(other.to_string())),
    }
}

fn from_fractional_secs(secs: f64) -> Option<DateTime<Utc>> {
    let whole = secs.floor();
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    let nanos = ((secs - whole) * 1_000_000_000.0).round() as u32;
    // 舍入可能进位到整秒
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole as i64 + 1, 0)
    } else {
        (whole as i64, nanos)
    };
    DateTime::from_timestamp(whole, nanos)
}

fn parse_text(text: &str, timezone: Tz) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Ok(parsed.with_timezone(&Utc));
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .ok_or_else(|| DecodeError::InvalidTimestamp(text.to_string()))?;
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(local) => Ok(local.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(DecodeError::InvalidTimestamp(format!(
            "{} does not exist in {}",
            text,
            timezone.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utc(text: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(text)
            .expect("rfc3339")
            .with_timezone(&Utc)
    }

    #[test]
    fn epoch_seconds_and_offset_string_agree() {
        let tz = chrono_tz::Europe::Warsaw;
        let from_epoch = parse_timestamp(&json!(1713669300), tz).expect("epoch");
        let from_text = parse_timestamp(&json!("2024-04-21T05:15:00+02:00"), tz).expect("text");
        assert_eq!(from_epoch, from_text);
        assert_eq!(from_epoch, utc("2024-04-21T03:15:00Z"));
    }

    #[test]
    fn naive_string_is_localized_to_configured_zone() {
        // 4 月华沙为夏令时 UTC+2
        let warsaw = parse_timestamp(&json!("2024-04-21T05:15:00"), chrono_tz::Europe::Warsaw)
            .expect("warsaw");
        assert_eq!(warsaw, utc("2024-04-21T03:15:00Z"));

        let utc_zone =
            parse_timestamp(&json!("2024-04-21 03:15:00"), chrono_tz::UTC).expect("utc");
        assert_eq!(utc_zone, utc("2024-04-21T03:15:00Z"));
    }

    #[test]
    fn fractional_epoch_keeps_subsecond_precision() {
        let parsed = parse_timestamp(&json!(1713669300.25), chrono_tz::UTC).expect("fractional");
        assert_eq!(parsed, utc("2024-04-21T03:15:00.250Z"));
    }

    #[test]
    fn ambiguous_local_time_resolves_to_earliest() {
        // 2024-10-27 02:30 在华沙出现两次（CEST 与 CET）
        let parsed = parse_timestamp(&json!("2024-10-27T02:30:00"), chrono_tz::Europe::Warsaw)
            .expect("ambiguous");
        assert_eq!(parsed, utc("2024-10-27T00:30:00Z"));
    }

    #[test]
    fn nonexistent_local_time_is_rejected() {
        // 2024-03-31 02:30 在华沙不存在（跳到 03:00）
        let err = parse_timestamp(&json!("2024-03-31T02:30:00"), chrono_tz::Europe::Warsaw)
            .expect_err("gap");
        assert!(matches!(err, DecodeError::InvalidTimestamp(_)));
    }

    #[test]
    fn out_of_range_instants_are_rejected() {
        let tz = chrono_tz::UTC;
        for value in [json!(99_999_999_999_i64), json!(-9_999_999_999_i64), json!("2300-01-01T00:00:00Z")] {
            let err = parse_timestamp(&value, tz).expect_err("out of range");
            assert!(matches!(err, DecodeError::InvalidTimestamp(_)), "{value}");
        }
        assert!(parse_timestamp(&json!("2262-01-01T00:00:00Z"), tz).is_ok());
    }

    #[test]
    fn non_timestamp_values_are_rejected() {
        let tz = chrono_tz::UTC;
        assert!(parse_timestamp(&json!(true), tz).is_err());
        assert!(parse_timestamp(&json!("yesterday"), tz).is_err());
        assert!(parse_timestamp(&json!(null), tz).is_err());
    }
}
