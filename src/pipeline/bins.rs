//! Dynamic hourly bucketing of the per-minute deltas.
//!
//! Bins are anchored to the detected production window rather than fixed
//! midnight-to-midnight hours: the first bin starts at the first-on minute,
//! the last one ends at the last-off minute, and only full clock hours in
//! between get regular bins.

use super::MinuteDeltaMap;
use crate::db::HourBin;
use crate::tz::{local_to_utc_ms, utc_offset_hours, DayBounds, MINUTE_MS};

use chrono::{DateTime, Datelike, Timelike};

/// Local wall-clock hour and minute of a UTC instant, applying the DST
/// offset of that instant's own calendar date.
fn local_hour_minute(utc_ms: i64) -> Option<(i64, i64)> {
    let dt = DateTime::from_timestamp_millis(utc_ms)?;
    let off = utc_offset_hours(dt.year(), dt.month(), dt.day());
    let local = DateTime::from_timestamp_millis(utc_ms - off * 3_600_000)?;
    Some((local.hour() as i64, local.minute() as i64))
}

fn sum_range(deltas: &MinuteDeltaMap, start_ms: i64, end_ms: i64, inclusive: bool) -> f64 {
    let mut sum = 0.0;
    let mut t = start_ms;
    while if inclusive { t <= end_ms } else { t < end_ms } {
        sum += deltas.get(&t).copied().unwrap_or(0.0);
        t += MINUTE_MS;
    }
    sum
}

/// Bucket the day's deltas into production-window-clipped hourly bins with a
/// running cumulative alongside. Empty when no production was detected.
///
/// The window endpoints each resolve their own DST offset; a window that
/// straddles the transition keeps both ends on their correct wall clock.
pub fn hourly_bins_dynamic(
    deltas: &MinuteDeltaMap,
    bounds: &DayBounds,
    first_on: Option<i64>,
    last_off: Option<i64>,
) -> Vec<HourBin> {
    let (Some(first), Some(last)) = (first_on, last_off) else {
        return Vec::new();
    };
    let (Some((h_start, min_start)), Some((h_end, min_end))) =
        (local_hour_minute(first), local_hour_minute(last))
    else {
        return Vec::new();
    };

    let (y, m, d) = (bounds.year, bounds.month, bounds.day);
    let mut bins: Vec<(String, i64)> = Vec::new();

    // First, possibly partial, hour.
    let s = local_to_utc_ms(y, m, d, h_start, min_start);
    let e = local_to_utc_ms(y, m, d, h_start + 1, 0);
    bins.push((
        format!("{:02}:{:02}", h_start, min_start),
        sum_range(deltas, s, e, false).round() as i64,
    ));

    // Full clock hours strictly between start and end.
    for hh in (h_start + 1)..h_end {
        let s = local_to_utc_ms(y, m, d, hh, 0);
        let e = local_to_utc_ms(y, m, d, hh + 1, 0);
        bins.push((
            format!("{:02}:00", hh),
            sum_range(deltas, s, e, false).round() as i64,
        ));
    }

    // Last partial hour, inclusive of the last-off minute.
    if h_end > h_start {
        let s = local_to_utc_ms(y, m, d, h_end, 0);
        let e = local_to_utc_ms(y, m, d, h_end, min_end);
        bins.push((
            format!("{:02}:{:02}", h_end, min_end),
            sum_range(deltas, s, e, true).round() as i64,
        ));
    }

    let mut out = Vec::with_capacity(bins.len());
    let mut acc = 0i64;
    for (label, produced) in bins {
        acc += produced;
        out.push(HourBin {
            label,
            produced,
            cumulative: acc,
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{build_minute_deltas, MinuteMap};
    use crate::tz::day_bounds_utc;

    fn winter_day() -> DayBounds {
        day_bounds_utc("2024-06-10").unwrap()
    }

    fn at(h: i64, m: i64) -> i64 {
        local_to_utc_ms(2024, 6, 10, h, m)
    }

    /// Steady production of 2 ticks/min between two local times.
    fn steady_deltas(from: (i64, i64), to: (i64, i64)) -> MinuteDeltaMap {
        let mut map = MinuteMap::new();
        let mut v = 100.0;
        let mut t = at(from.0, from.1) - MINUTE_MS;
        map.insert(t, v);
        while t < at(to.0, to.1) {
            t += MINUTE_MS;
            v += 2.0;
            map.insert(t, v);
        }
        build_minute_deltas(&map, 1.0)
    }

    #[test]
    fn test_empty_window_empty_bins() {
        let bins = hourly_bins_dynamic(&MinuteDeltaMap::new(), &winter_day(), None, None);
        assert!(bins.is_empty());
    }

    #[test]
    fn test_single_minute_single_bin() {
        let mut map = MinuteMap::new();
        map.insert(at(7, 59), 100.0);
        map.insert(at(8, 0), 104.0);
        let deltas = build_minute_deltas(&map, 1.0);
        let bins = hourly_bins_dynamic(&deltas, &winter_day(), Some(at(8, 0)), Some(at(8, 0)));
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].label, "08:00");
        assert_eq!(bins[0].produced, 4);
        assert_eq!(bins[0].cumulative, 4);
    }

    #[test]
    fn test_partial_first_and_last_bins() {
        // Production 08:20 through 10:40 at 2 ticks/min.
        let deltas = steady_deltas((8, 20), (10, 40));
        let bins =
            hourly_bins_dynamic(&deltas, &winter_day(), Some(at(8, 20)), Some(at(10, 40)));

        let labels: Vec<&str> = bins.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["08:20", "09:00", "10:40"]);

        // 08:20..09:00 -> 40 min, 09:00..10:00 -> 60 min,
        // 10:00..=10:40 -> 41 min (last bin includes its end minute).
        assert_eq!(bins[0].produced, 80);
        assert_eq!(bins[1].produced, 120);
        assert_eq!(bins[2].produced, 82);

        let cum: Vec<i64> = bins.iter().map(|b| b.cumulative).collect();
        assert_eq!(cum, vec![80, 200, 282]);
    }

    #[test]
    fn test_window_within_one_hour() {
        let deltas = steady_deltas((14, 10), (14, 35));
        let bins =
            hourly_bins_dynamic(&deltas, &winter_day(), Some(at(14, 10)), Some(at(14, 35)));
        // No last bin when the window never leaves the start hour.
        assert_eq!(bins.len(), 1);
        assert_eq!(bins[0].label, "14:10");
        // 14:10..15:00 scan covers the 26 producing minutes.
        assert_eq!(bins[0].produced, 52);
    }

    #[test]
    fn test_local_hour_minute_uses_endpoint_date_offset() {
        // 2024-06-10 12:30 UTC is winter in Chile: UTC-4 -> 08:30 local.
        let winter = at(8, 30);
        assert_eq!(local_hour_minute(winter), Some((8, 30)));

        // 2024-12-25 12:30 UTC is summer: UTC-3 -> 09:30 local.
        let summer = local_to_utc_ms(2024, 12, 25, 9, 30);
        assert_eq!(local_hour_minute(summer), Some((9, 30)));
    }
}
