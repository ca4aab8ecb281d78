//! Casting primitives for seed normalization
//!
//! Raw seed rows are loosely typed (`serde_json` values straight out of CSV
//! or JSON), so every canonical field goes through exactly one cast here.
//! Each cast either produces the declared type or fails with
//! [`Error::TypeMismatch`]; there are no silent defaults.
//!
//! The one deliberate exception is [`empty_as_null`]: an empty-string
//! timestamp means "absent" in the seeds, so it coalesces to `None` BEFORE
//! the strict timestamp cast runs. Keeping that rule out of
//! [`cast_timestamp`] means a malformed timestamp can never be mistaken for
//! an absent one.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use crate::{Error, Result};

/// A raw, loosely-typed seed row keyed by source column name.
pub type RawRow = serde_json::Map<String, Value>;

/// Fetch a required column from a raw row.
///
/// # Errors
/// Returns `TypeMismatch` (against `expected`) if the column is missing or
/// JSON-null.
pub fn required<'a>(row: &'a RawRow, column: &str, expected: &'static str) -> Result<&'a Value> {
    match row.get(column) {
        Some(v) if !v.is_null() => Ok(v),
        _ => Err(Error::type_mismatch(column, &Value::Null, expected)),
    }
}

/// Cast a raw value to a 64-bit integer.
///
/// Accepts JSON integers and integer-valued strings. Floats are accepted
/// only when they carry no fractional part (CSV round-trips sometimes
/// render counts as `3.0`).
///
/// # Errors
/// `TypeMismatch` on anything non-numeric.
pub fn cast_i64(column: &str, value: &Value) -> Result<i64> {
    match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 9.2e18 {
                    #[allow(clippy::cast_possible_truncation)]
                    return Ok(f as i64);
                }
            }
            Err(Error::type_mismatch(column, value, "i64"))
        }
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::type_mismatch(column, value, "i64")),
        _ => Err(Error::type_mismatch(column, value, "i64")),
    }
}

/// Cast a raw value to a double-precision float.
///
/// # Errors
/// `TypeMismatch` on anything non-numeric.
pub fn cast_f64(column: &str, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| Error::type_mismatch(column, value, "f64")),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Error::type_mismatch(column, value, "f64")),
        _ => Err(Error::type_mismatch(column, value, "f64")),
    }
}

/// Cast a raw value to a boolean.
///
/// Recognized encodings: JSON booleans, 0/1 (number or string), and the
/// strings `true`/`false`/`t`/`f` in any casing.
///
/// # Errors
/// `TypeMismatch` on any other encoding.
pub fn cast_bool(column: &str, value: &Value) -> Result<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(Error::type_mismatch(column, value, "bool")),
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" => Ok(true),
            "false" | "f" | "0" => Ok(false),
            _ => Err(Error::type_mismatch(column, value, "bool")),
        },
        _ => Err(Error::type_mismatch(column, value, "bool")),
    }
}

/// Cast a raw value to a string.
///
/// Numbers and booleans are rendered; arrays and objects are rejected.
///
/// # Errors
/// `TypeMismatch` on non-scalar input.
pub fn cast_string(column: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        _ => Err(Error::type_mismatch(column, value, "string")),
    }
}

/// Cast an optional raw value to a lowercased string.
///
/// Absent or JSON-null input yields `None` (no default substitution);
/// present input is cast to string and lowercased regardless of source
/// casing.
///
/// # Errors
/// `TypeMismatch` on non-scalar input.
pub fn cast_lower_string(column: &str, value: Option<&Value>) -> Result<Option<String>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(v) => Ok(Some(cast_string(column, v)?.to_lowercase())),
    }
}

/// Cast a raw value to a UTC timestamp.
///
/// Accepts RFC 3339 (the seeds use ISO-8601 Zulu) and the space-separated
/// `YYYY-MM-DD HH:MM:SS` form some CSV exports produce (interpreted as UTC).
///
/// # Errors
/// `TypeMismatch` on unparseable input. An empty string is unparseable
/// here; callers that want empty-means-absent go through [`empty_as_null`].
pub fn cast_timestamp(column: &str, value: &Value) -> Result<DateTime<Utc>> {
    let Value::String(s) = value else {
        return Err(Error::type_mismatch(column, value, "timestamp"));
    };
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Ok(naive.and_utc());
    }
    Err(Error::type_mismatch(column, value, "timestamp"))
}

/// Cast a raw value to a calendar date (`YYYY-MM-DD`).
///
/// # Errors
/// `TypeMismatch` on unparseable input.
pub fn cast_date(column: &str, value: &Value) -> Result<NaiveDate> {
    let Value::String(s) = value else {
        return Err(Error::type_mismatch(column, value, "date"));
    };
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| Error::type_mismatch(column, value, "date"))
}

/// The empty-string-means-null coalescing step for nullable timestamps.
///
/// Absent, JSON-null, or empty-string input yields `None`; everything else
/// goes through the strict [`cast_timestamp`], so `""` is absent but
/// `"not-a-date"` is still a hard error.
///
/// # Errors
/// `TypeMismatch` on non-empty unparseable input.
pub fn empty_as_null(column: &str, value: Option<&Value>) -> Result<Option<DateTime<Utc>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(v) => cast_timestamp(column, v).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cast_i64_accepts_numbers_and_numeric_strings() {
        assert_eq!(cast_i64("user_id", &json!(42)).unwrap(), 42);
        assert_eq!(cast_i64("user_id", &json!("42")).unwrap(), 42);
        assert_eq!(cast_i64("user_id", &json!(" 7 ")).unwrap(), 7);
        assert_eq!(cast_i64("user_id", &json!(3.0)).unwrap(), 3);
    }

    #[test]
    fn test_cast_i64_rejects_non_numeric() {
        assert!(cast_i64("user_id", &json!("u01_000001")).is_err());
        assert!(cast_i64("user_id", &json!(3.5)).is_err());
        assert!(cast_i64("user_id", &json!(true)).is_err());
    }

    #[test]
    fn test_cast_bool_encodings() {
        for truthy in [json!(true), json!(1), json!("true"), json!("T"), json!("1")] {
            assert!(cast_bool("conversion", &truthy).unwrap());
        }
        for falsy in [json!(false), json!(0), json!("false"), json!("f"), json!("0")] {
            assert!(!cast_bool("conversion", &falsy).unwrap());
        }
        assert!(cast_bool("conversion", &json!("yes")).is_err());
        assert!(cast_bool("conversion", &json!(2)).is_err());
    }

    #[test]
    fn test_cast_lower_string_normalizes_case() {
        let v = json!("Control");
        assert_eq!(
            cast_lower_string("variant", Some(&v)).unwrap(),
            Some("control".to_string())
        );
    }

    #[test]
    fn test_cast_lower_string_absent_stays_absent() {
        assert_eq!(cast_lower_string("platform", None).unwrap(), None);
        let null = Value::Null;
        assert_eq!(cast_lower_string("platform", Some(&null)).unwrap(), None);
    }

    #[test]
    fn test_cast_timestamp_formats() {
        let zulu = json!("2025-03-01T09:00:00Z");
        assert_eq!(
            cast_timestamp("assigned_at", &zulu).unwrap().to_rfc3339(),
            "2025-03-01T09:00:00+00:00"
        );
        let spaced = json!("2025-03-01 09:00:00");
        assert!(cast_timestamp("assigned_at", &spaced).is_ok());
        assert!(cast_timestamp("assigned_at", &json!("not-a-date")).is_err());
    }

    #[test]
    fn test_empty_as_null_coalesces_but_stays_strict() {
        let empty = json!("");
        assert_eq!(empty_as_null("paid_at", Some(&empty)).unwrap(), None);
        assert_eq!(empty_as_null("paid_at", None).unwrap(), None);

        let bad = json!("not-a-date");
        assert!(empty_as_null("paid_at", Some(&bad)).is_err());

        let good = json!("2025-03-02T10:30:00Z");
        assert!(empty_as_null("paid_at", Some(&good)).unwrap().is_some());
    }

    #[test]
    fn test_cast_date() {
        assert!(cast_date("event_date", &json!("2025-03-01")).is_ok());
        assert!(cast_date("event_date", &json!("03/01/2025")).is_err());
    }
}
