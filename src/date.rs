use chrono::{Duration, NaiveDate};

/// Format used for day keys and for dates in the snapshot schema.
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";

/// Render a date as its `YYYY-MM-DD` day key. Keys collate in date order.
pub fn day_key(date: NaiveDate) -> String {
    date.format(DAY_KEY_FORMAT).to_string()
}

/// Parse a `YYYY-MM-DD` day key. Anything else yields `None`.
pub fn parse_key(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DAY_KEY_FORMAT).ok()
}

/// Offset a date by a signed number of calendar days.
pub fn add_days(date: NaiveDate, n: i64) -> NaiveDate {
    date + Duration::days(n)
}

/// Signed distance `b - a` in whole days.
pub fn days_between(a: NaiveDate, b: NaiveDate) -> i64 {
    (b - a).num_days()
}

/// Swap an inverted range. Ranges with a missing endpoint pass through.
pub fn normalize_range(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    match (start, end) {
        (Some(s), Some(e)) if e < s => (Some(e), Some(s)),
        other => other,
    }
}
