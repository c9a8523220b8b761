//! Chile local-time arithmetic for the history pipeline.
//!
//! Counter samples are stored and fetched as UTC instants, but every report
//! is expressed in Chilean wall-clock time. Chile has no fixed offset: it is
//! UTC-3 while daylight saving is active and UTC-4 otherwise, with DST
//! running from the first Sunday of September through the first Sunday of
//! April of the following year. All offset decisions in the crate go through
//! this module so the two ends of a production window can never disagree on
//! the rule.

use chrono::{Datelike, Duration, NaiveDate, Utc};

/// One minute in epoch milliseconds.
pub const MINUTE_MS: i64 = 60_000;

/// Bounds of one local calendar day expressed as UTC instants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayBounds {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub is_dst: bool,
    /// Local midnight, epoch ms.
    pub begin_ms: i64,
    /// Local midnight of the next day, epoch ms.
    pub end_ms: i64,
}

fn first_sunday(year: i32, month: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let add = (7 - first.weekday().num_days_from_sunday()) % 7;
    Some(first + Duration::days(add as i64))
}

/// Whether Chilean DST is active on the given calendar date.
///
/// Evaluated at local noon to stay clear of the transition instants, exactly
/// as the reporting backend has always done: active from the first Sunday of
/// September (inclusive) to the first Sunday of April of the next year
/// (exclusive).
pub fn is_chile_dst(year: i32, month: u32, day: u32) -> bool {
    let (probe, start, end) = match (
        NaiveDate::from_ymd_opt(year, month, day),
        first_sunday(year, 9),
        first_sunday(year + 1, 4),
    ) {
        (Some(p), Some(s), Some(e)) => (p, s, e),
        _ => return false,
    };
    probe >= start && probe < end
}

/// UTC offset in hours for the given local calendar date.
pub fn utc_offset_hours(year: i32, month: u32, day: u32) -> i64 {
    if is_chile_dst(year, month, day) {
        3
    } else {
        4
    }
}

/// Convert a Chilean wall-clock time to a UTC instant (epoch ms).
///
/// `hour` may exceed 23 (e.g. 24 for next-day midnight); the overflow rolls
/// into the following day.
pub fn local_to_utc_ms(year: i32, month: u32, day: u32, hour: i64, minute: i64) -> i64 {
    let base = match NaiveDate::from_ymd_opt(year, month, day) {
        Some(d) => d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis()),
        None => None,
    };
    let base = base.unwrap_or(0);
    let off = utc_offset_hours(year, month, day);
    base + (hour + off) * 3_600_000 + minute * MINUTE_MS
}

/// Resolve the UTC bounds of a local calendar day given as `YYYY-MM-DD`.
pub fn day_bounds_utc(day_iso: &str) -> Option<DayBounds> {
    let date = NaiveDate::parse_from_str(day_iso, "%Y-%m-%d").ok()?;
    let (y, m, d) = (date.year(), date.month(), date.day());
    Some(DayBounds {
        year: y,
        month: m,
        day: d,
        is_dst: is_chile_dst(y, m, d),
        begin_ms: local_to_utc_ms(y, m, d, 0, 0),
        end_ms: local_to_utc_ms(y, m, d, 24, 0),
    })
}

/// Enumerate the UTC instants of every minute between two local hours
/// (`hour_end` exclusive) of one local day.
pub fn minute_range_utc(year: i32, month: u32, day: u32, hour_start: i64, hour_end: i64) -> Vec<i64> {
    let s = local_to_utc_ms(year, month, day, hour_start, 0);
    let e = local_to_utc_ms(year, month, day, hour_end, 0);
    let mut mins = Vec::with_capacity(((e - s) / MINUTE_MS).max(0) as usize);
    let mut t = s;
    while t < e {
        mins.push(t);
        t += MINUTE_MS;
    }
    mins
}

/// Truncate an epoch-ms instant to its containing minute.
pub fn to_minute(ms: i64) -> i64 {
    ms.div_euclid(MINUTE_MS) * MINUTE_MS
}

/// Current local calendar date in Chile, `YYYY-MM-DD`.
pub fn today_local_iso() -> String {
    let now = Utc::now();
    let off = utc_offset_hours(now.year(), now.month(), now.day());
    let local = now - Duration::hours(off);
    local.format("%Y-%m-%d").to_string()
}

/// Every local calendar day from `start_iso` to `end_iso` inclusive.
pub fn list_days_iso(start_iso: &str, end_iso: &str) -> Vec<String> {
    let (start, end) = match (
        NaiveDate::parse_from_str(start_iso, "%Y-%m-%d"),
        NaiveDate::parse_from_str(end_iso, "%Y-%m-%d"),
    ) {
        (Ok(s), Ok(e)) => (s, e),
        _ => return Vec::new(),
    };
    let mut out = Vec::new();
    let mut d = start;
    while d <= end {
        out.push(d.format("%Y-%m-%d").to_string());
        match d.succ_opt() {
            Some(next) => d = next,
            None => break,
        }
    }
    out
}

const WEEKDAYS_ES: [&str; 7] = ["lun", "mar", "mié", "jue", "vie", "sáb", "dom"];

/// Chart label for a day: Spanish short weekday plus `MM-DD`.
pub fn day_label(day_iso: &str) -> String {
    match NaiveDate::parse_from_str(day_iso, "%Y-%m-%d") {
        Ok(d) => format!(
            "{}, {:02}-{:02}",
            WEEKDAYS_ES[d.weekday().num_days_from_monday() as usize],
            d.month(),
            d.day()
        ),
        Err(_) => day_iso.to_string(),
    }
}
