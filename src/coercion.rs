//! Conversion of untrusted spreadsheet cells into numbers and dates.
//!
//! The default functions never fail: malformed numbers become `0.0` and
//! malformed dates become `None`. The `try_` variants report the problem
//! instead and back the normalizer's strict mode.

use crate::record::CellValue;
use crate::utils::serial_to_datetime;
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Characters removed from numeric text: currency symbols (`S/`, `$`) and
/// thousands separators. Whitespace is removed as well.
const STRIPPED_CHARS: [char; 4] = ['S', '/', '$', ','];

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

pub fn coerce_number(raw: &CellValue) -> f64 {
    match raw {
        CellValue::Number(n) => *n,
        CellValue::Text(text) => match leading_float(&strip_numeric_noise(text)) {
            Some(value) if value != 0.0 => value,
            _ => 0.0,
        },
        CellValue::Empty | CellValue::Bool(_) | CellValue::Date(_) => 0.0,
    }
}

pub fn coerce_date(raw: &CellValue) -> Option<NaiveDateTime> {
    if raw.is_falsy() {
        return None;
    }
    match raw {
        CellValue::Date(date) => Some(*date),
        CellValue::Number(serial) => serial_to_datetime(*serial),
        CellValue::Text(text) => parse_date_text(text),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// Strict counterpart of [`coerce_number`]. Empty cells are still 0; any
/// other cell must hold a complete number once currency noise is removed.
pub fn try_coerce_number(raw: &CellValue) -> Result<f64, String> {
    match raw {
        CellValue::Empty => Ok(0.0),
        CellValue::Number(n) if n.is_finite() => Ok(*n),
        CellValue::Number(_) => Err("number is not finite".to_string()),
        CellValue::Text(text) => {
            let cleaned = strip_numeric_noise(text);
            if cleaned.is_empty() {
                return Ok(0.0);
            }
            cleaned
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| "text is not a number".to_string())
        }
        CellValue::Bool(_) => Err("boolean cell in numeric field".to_string()),
        CellValue::Date(_) => Err("date cell in numeric field".to_string()),
    }
}

/// Strict counterpart of [`coerce_date`]. Falsy cells are still `None`.
pub fn try_coerce_date(raw: &CellValue) -> Result<Option<NaiveDateTime>, String> {
    if raw.is_falsy() {
        return Ok(None);
    }
    match raw {
        CellValue::Date(date) => Ok(Some(*date)),
        CellValue::Number(serial) => serial_to_datetime(*serial)
            .map(Some)
            .ok_or_else(|| "serial date out of range".to_string()),
        CellValue::Text(text) => parse_date_text(text)
            .map(Some)
            .ok_or_else(|| "unrecognized date format".to_string()),
        CellValue::Bool(_) => Err("boolean cell in date field".to_string()),
        CellValue::Empty => Ok(None),
    }
}

fn strip_numeric_noise(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && !STRIPPED_CHARS.contains(c))
        .collect()
}

/// Parses the longest leading decimal float of `text` (`"12.5kg"` is 12.5).
fn leading_float(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut mantissa_digits = end - int_start;

    if end < bytes.len() && bytes[end] == b'.' {
        let mut frac_end = end + 1;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        let frac_digits = frac_end - end - 1;
        if mantissa_digits + frac_digits > 0 {
            mantissa_digits += frac_digits;
            end = frac_end;
        }
    }

    if mantissa_digits == 0 {
        return None;
    }

    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && matches!(bytes[exp_end], b'+' | b'-') {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    // "Infinity" has no digits and overflowing exponents are dropped, so both read as 0.
    text[..end].parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Generic date-string parsing. Offsets are converted to UTC; strings
/// without one are taken as UTC.
fn parse_date_text(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.naive_utc());
    }

    DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
