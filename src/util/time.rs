use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Timelike};

/// Renders a millisecond epoch timestamp as a local-time ISO-8601 string.
///
/// Zero and out-of-range values yield an empty string, matching how the
/// remote service marks "no timestamp". Fractional seconds are printed as
/// six digits, and only when non-zero.
pub fn format_timestamp_ms(ms: i64) -> String {
    if ms == 0 {
        return String::new();
    }
    match DateTime::from_timestamp_millis(ms) {
        Some(utc) => {
            let local = utc.with_timezone(&Local).naive_local();
            let pattern = if local.nanosecond() == 0 {
                "%Y-%m-%dT%H:%M:%S"
            } else {
                "%Y-%m-%dT%H:%M:%S%.6f"
            };
            local.format(pattern).to_string()
        }
        None => String::new(),
    }
}

/// Renders a millisecond epoch timestamp as `YYYY-MM-DD HH:MM` local time.
pub fn format_timestamp_short(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|utc| utc.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

/// Milliseconds since epoch for `days` days before `now`.
///
/// `None` when the result falls outside the representable date range.
pub fn days_ago_ms(days: u32, now: DateTime<Local>) -> Option<i64> {
    Duration::try_days(i64::from(days))
        .and_then(|span| now.checked_sub_signed(span))
        .map(|then| then.timestamp_millis())
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(date_str: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
}

/// Milliseconds since epoch of local midnight at the start of `date`.
///
/// When midnight does not exist locally (DST gap), the earliest valid
/// instant of that wall-clock time is used, falling back to UTC.
pub fn local_midnight_ms(date: NaiveDate) -> i64 {
    let midnight = date.and_time(chrono::NaiveTime::MIN);
    match Local.from_local_datetime(&midnight).earliest() {
        Some(local) => local.timestamp_millis(),
        None => midnight.and_utc().timestamp_millis(),
    }
}

/// Returns the user-supplied output prefix, or a timestamped default.
pub fn generate_output_prefix(prefix: Option<&str>, now: DateTime<Local>) -> String {
    match prefix {
        Some(p) if !p.trim().is_empty() => p.to_string(),
        _ => format!("feedly_articles_{}", now.format("%Y%m%d_%H%M%S")),
    }
}
