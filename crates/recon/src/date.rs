//! Calendar-date normalization.
//!
//! Spreadsheet dates arrive as serials or local date-times; API dates arrive
//! as UTC timestamps. Both collapse to the calendar date in the value's own
//! timezone, which is then treated as a UTC calendar date.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime};

use crate::error::ReconError;
use crate::value::Value;

/// Excel 1900 date system epoch (serial 0). Serials below 60 are shifted by a
/// day because Excel counts the non-existent 1900-02-29.
fn excel_epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or_default()
}

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Truncate a date-like value to its calendar date.
///
/// Blank values are `Ok(None)`: an absent date is "not supplied", never a
/// default date.
pub fn normalize_date(value: &Value) -> Result<Option<NaiveDate>, ReconError> {
    match value {
        v if v.is_blank() => Ok(None),
        Value::Date(d) => Ok(Some(*d)),
        Value::DateTime(dt) => Ok(Some(dt.date_naive())),
        Value::Number(n) => serial_to_date(n.0).map(Some).ok_or_else(|| ReconError::DateParse {
            field: None,
            value: value.to_string(),
        }),
        Value::Text(s) => parse_date_text(s.trim()).map(Some).ok_or_else(|| ReconError::DateParse {
            field: None,
            value: s.clone(),
        }),
        other => Err(ReconError::DateParse { field: None, value: other.to_string() }),
    }
}

/// `normalize_date` lifted back into a `Value` (`Date` or `Empty`).
pub fn normalize_date_value(value: &Value) -> Result<Value, ReconError> {
    Ok(normalize_date(value)?.map(Value::Date).unwrap_or(Value::Empty))
}

fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let whole = serial.floor() as i64;
    let days = if whole < 60 { whole + 1 } else { whole };
    excel_epoch().checked_add_days(Days::new(days as u64))
}

fn parse_date_text(s: &str) -> Option<NaiveDate> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}
