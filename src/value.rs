use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Coerce a loosely-typed upstream field to an integer. The service mixes
/// native numbers, numeric strings (often with a trailing `.0`), booleans
/// and the `"-"` placeholder; anything unusable reads as zero.
pub fn as_i64(value: &Value) -> i64 {
    if let Value::Number(n) = value {
        if let Some(i) = n.as_i64() {
            return i;
        }
    }
    as_f64(value) as i64
}

/// Float companion of [`as_i64`], same tolerance rules.
pub fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == "-" {
                0.0
            } else {
                trimmed.parse().unwrap_or_else(|_| {
                    log::debug!("unexpected value during float coercion: {:?}", s);
                    0.0
                })
            }
        }
        _ => 0.0,
    }
}

/// Parse a naive `YYYY-MM-DD HH:MM:SS` timestamp. The service reports local
/// wall-clock time without an offset; it is interpreted in the host's
/// configured timezone and converted to UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    parse_timestamp_in(raw, &Local)
}

pub fn parse_timestamp_in<Tz: TimeZone>(raw: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }

    let naive = match NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT) {
        Ok(naive) => naive,
        Err(e) => {
            log::warn!("failed to parse timestamp {:?}: {}", raw, e);
            return None;
        }
    };

    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{FixedOffset, SecondsFormat};
    use serde_json::json;

    #[test]
    fn placeholders_coerce_to_zero() {
        for value in [json!(null), json!(""), json!(" "), json!("-")].iter() {
            assert_eq!(0, as_i64(value));
            assert_eq!(0.0, as_f64(value));
        }
    }

    #[test]
    fn numeric_strings_with_trailing_fraction_truncate() {
        assert_eq!(22706, as_i64(&json!("22706.0")));
        assert_eq!(22706.0, as_f64(&json!("22706.0")));
        assert_eq!(3, as_i64(&json!("3.7")));
    }

    #[test]
    fn booleans_coerce_to_unit_values() {
        assert_eq!(1, as_i64(&json!(true)));
        assert_eq!(0, as_i64(&json!(false)));
        assert_eq!(1.0, as_f64(&json!(true)));
        assert_eq!(0.0, as_f64(&json!(false)));
    }

    #[test]
    fn native_numbers_pass_through() {
        assert_eq!(42, as_i64(&json!(42)));
        assert_eq!(-7, as_i64(&json!(-7.9)));
        assert_eq!(1378.6, as_f64(&json!(1378.6)));
    }

    #[test]
    fn garbage_coerces_to_zero() {
        assert_eq!(0, as_i64(&json!("offline")));
        assert_eq!(0.0, as_f64(&json!({ "nested": 1 })));
        assert_eq!(0.0, as_f64(&json!(["1"])));
    }

    #[test]
    fn naive_timestamp_converts_from_fixed_offset() {
        let tz = FixedOffset::east_opt(3600).unwrap();
        let instant = parse_timestamp_in("2024-03-01 12:00:00", &tz).unwrap();
        assert_eq!(
            "2024-03-01T11:00:00Z",
            instant.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }

    #[test]
    fn malformed_timestamp_yields_none() {
        let tz = FixedOffset::east_opt(0).unwrap();
        assert!(parse_timestamp_in("01.03.2024 12:00", &tz).is_none());
        assert!(parse_timestamp_in("not a time", &tz).is_none());
        assert!(parse_timestamp("").is_none());
    }
}
