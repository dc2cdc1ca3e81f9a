use chrono::{DateTime, Datelike, NaiveDateTime};

/// Spreadsheet serial of 1970-01-01 (serial day 0 is 1899-12-30).
pub const SERIAL_UNIX_EPOCH: f64 = 25569.0;

pub const MILLIS_PER_DAY: i64 = 86_400_000;

/// Decodes a spreadsheet serial date as `(serial - 25569) * 86400 * 1000`
/// milliseconds after the Unix epoch. Sub-millisecond fractions truncate.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    let millis = (serial - SERIAL_UNIX_EPOCH) * MILLIS_PER_DAY as f64;
    if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp_millis(millis.trunc() as i64).map(|dt| dt.naive_utc())
}

/// Inverse of [`serial_to_datetime`].
pub fn datetime_to_serial(date: NaiveDateTime) -> f64 {
    date.and_utc().timestamp_millis() as f64 / MILLIS_PER_DAY as f64 + SERIAL_UNIX_EPOCH
}

/// Whole days from `due` to `now`, rounded up. Positive means overdue, and
/// any positive fraction of a day counts as a full day.
pub fn days_overdue(now: NaiveDateTime, due: NaiveDateTime) -> i64 {
    let millis = (now - due).num_milliseconds();
    let days = millis.div_euclid(MILLIS_PER_DAY);
    if millis.rem_euclid(MILLIS_PER_DAY) != 0 {
        days + 1
    } else {
        days
    }
}

/// Zero-based calendar month index of `date` within `year`, if it falls in it.
pub fn month_index_in_year(date: NaiveDateTime, year: i32) -> Option<usize> {
    (date.year() == year).then(|| date.month0() as usize)
}

/// Heuristic classification of a free-text currency cell. Matches if the
/// upper-cased text contains any of the markers.
pub fn is_foreign_currency(currency: &str, markers: &[String]) -> bool {
    let upper = currency.to_uppercase();
    markers
        .iter()
        .any(|marker| !marker.is_empty() && upper.contains(&marker.to_uppercase()))
}
