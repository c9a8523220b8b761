//! Sample normalization: raw vendor rows to a one-reading-per-minute map,
//! plus the counter scale (divisor) heuristic.

use super::MinuteMap;
use crate::tz::to_minute;
use crate::vbox::RawSample;

use std::collections::BTreeMap;

/// Parse a vendor value string, accepting a comma decimal separator.
pub fn parse_locale_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let v: f64 = s.replace(',', ".").parse().ok()?;
    v.is_finite().then_some(v)
}

/// Collapse a raw, possibly duplicated and out-of-order sample stream into
/// one reading per minute (last write wins per minute).
///
/// When the raw string carries a decimal point the value is multiplied by 10:
/// some firmware revisions report the counter in tenths, and only those emit
/// fractional readings. Samples with an unparseable timestamp or value are
/// dropped.
pub fn collapse_to_minute_map(rows: &[RawSample]) -> MinuteMap {
    let mut map = BTreeMap::new();
    for row in rows {
        let Some(t) = row.timestamp_ms() else {
            continue;
        };
        let Some(raw) = row.value.as_deref() else {
            continue;
        };
        let Some(mut v) = parse_locale_number(raw) else {
            continue;
        };
        if raw.contains('.') {
            v *= 10.0;
        }
        map.insert(to_minute(t), v);
    }
    map
}

/// Count significant decimal digits of a delta, up to six.
fn decimal_digits(v: f64) -> u32 {
    let s = format!("{:.6}", v.abs());
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    match trimmed.find('.') {
        Some(i) => (trimmed.len() - i - 1) as u32,
        None => 0,
    }
}

/// Infer the counter divisor from the decimal-digit distribution of the
/// successive positive deltas.
///
/// If the modal decimal-digit count `d` covers at least 60% of the deltas and
/// `d > 0`, the divisor is `10^min(d, 3)`; otherwise 1. Detection needs at
/// least 10 positive deltas, so sparse days fall back to 1. The result is
/// always a positive power of ten no greater than 1000.
pub fn detect_divisor(map: &MinuteMap) -> f64 {
    let readings: Vec<f64> = map.values().copied().collect();
    let deltas: Vec<f64> = readings
        .windows(2)
        .map(|w| w[1] - w[0])
        .filter(|d| d.is_finite() && *d > 0.0)
        .collect();
    if deltas.len() < 10 {
        return 1.0;
    }

    let mut hist: BTreeMap<u32, usize> = BTreeMap::new();
    for d in &deltas {
        *hist.entry(decimal_digits(*d)).or_insert(0) += 1;
    }

    let Some((&best_dec, &best_cnt)) = hist.iter().max_by_key(|(_, c)| **c) else {
        return 1.0;
    };

    let ratio = best_cnt as f64 / deltas.len() as f64;
    if ratio >= 0.6 && best_dec > 0 {
        10f64.powi(best_dec.min(3) as i32)
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tz::MINUTE_MS;

    fn sample(t: i64, value: &str) -> RawSample {
        RawSample {
            monitor_time: Some(t),
            monitor_time_show: None,
            value: Some(value.to_string()),
        }
    }

    const T0: i64 = 1_718_000_040_000; // minute-aligned

    #[test]
    fn test_parse_locale_number() {
        assert_eq!(parse_locale_number("105"), Some(105.0));
        assert_eq!(parse_locale_number("105,3"), Some(105.3));
        assert_eq!(parse_locale_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_locale_number(""), None);
        assert_eq!(parse_locale_number("abc"), None);
    }

    #[test]
    fn test_collapse_last_write_wins() {
        let rows = vec![
            sample(T0 + 10_000, "100"),
            sample(T0 + 50_000, "101"), // same minute, later sample wins
            sample(T0 + MINUTE_MS, "103"),
        ];
        let map = collapse_to_minute_map(&rows);
        assert_eq!(map.len(), 2);
        assert_eq!(map[&T0], 101.0);
        assert_eq!(map[&(T0 + MINUTE_MS)], 103.0);
        assert!(map.keys().all(|k| k % MINUTE_MS == 0));
    }

    #[test]
    fn test_collapse_out_of_order_and_malformed() {
        let rows = vec![
            sample(T0 + MINUTE_MS, "110"),
            sample(T0, "100"),
            sample(T0 + 2 * MINUTE_MS, "not-a-number"),
            RawSample {
                monitor_time: None,
                monitor_time_show: Some("garbage".into()),
                value: Some("120".into()),
            },
        ];
        let map = collapse_to_minute_map(&rows);
        // Malformed rows are dropped, order is restored by the map.
        assert_eq!(
            map.keys().copied().collect::<Vec<_>>(),
            vec![T0, T0 + MINUTE_MS]
        );
    }

    #[test]
    fn test_decimal_point_scales_by_ten() {
        let rows = vec![sample(T0, "105.3"), sample(T0 + MINUTE_MS, "105,7")];
        let map = collapse_to_minute_map(&rows);
        // "105.3" reports in tenths and is lifted to 1053; the comma form
        // is parsed as-is.
        assert_eq!(map[&T0], 1053.0);
        assert_eq!(map[&(T0 + MINUTE_MS)], 105.7);
    }

    #[test]
    fn test_decimal_digits() {
        assert_eq!(decimal_digits(5.0), 0);
        assert_eq!(decimal_digits(0.5), 1);
        assert_eq!(decimal_digits(0.25), 2);
        assert_eq!(decimal_digits(-0.125), 3);
    }

    #[test]
    fn test_divisor_needs_ten_deltas() {
        let mut map = MinuteMap::new();
        for i in 0..8 {
            map.insert(T0 + i * MINUTE_MS, 10.0 + i as f64 * 0.5);
        }
        // Only 7 positive deltas: detection is not attempted.
        assert_eq!(detect_divisor(&map), 1.0);
    }

    #[test]
    fn test_divisor_detects_tenths() {
        let mut map = MinuteMap::new();
        for i in 0..15 {
            map.insert(T0 + i * MINUTE_MS, 100.0 + i as f64 * 0.5);
        }
        assert_eq!(detect_divisor(&map), 10.0);
    }

    #[test]
    fn test_divisor_integer_deltas() {
        let mut map = MinuteMap::new();
        for i in 0..15 {
            map.insert(T0 + i * MINUTE_MS, 100.0 + i as f64 * 3.0);
        }
        assert_eq!(detect_divisor(&map), 1.0);
    }

    #[test]
    fn test_divisor_capped_at_thousand() {
        let mut map = MinuteMap::new();
        for i in 0..15 {
            map.insert(T0 + i * MINUTE_MS, 100.0 + i as f64 * 0.00012);
        }
        let div = detect_divisor(&map);
        assert!(div <= 1000.0);
        assert_eq!(div, 1000.0);
    }

    #[test]
    fn test_divisor_mixed_below_threshold() {
        let mut map = MinuteMap::new();
        // Half the deltas integer, half tenths: no 60% majority of a
        // non-zero digit count.
        for i in 0..20 {
            let step = if i % 2 == 0 { 1.0 } else { 0.5 };
            let prev = map
                .values()
                .last()
                .copied()
                .unwrap_or(100.0);
            map.insert(T0 + i * MINUTE_MS, prev + step);
        }
        assert_eq!(detect_divisor(&map), 1.0);
    }

    #[test]
    fn test_divisor_tracks_reading_scale() {
        // Shrinking every reading by a power of ten shifts the decimal-digit
        // distribution and the detected divisor follows it; a factor that is
        // not a power of ten leaves the divisor untouched.
        let mut plain = MinuteMap::new();
        let mut tenths = MinuteMap::new();
        let mut tripled = MinuteMap::new();
        for i in 0..20 {
            let v = 100.0 + i as f64 * 7.0;
            plain.insert(T0 + i * MINUTE_MS, v);
            tenths.insert(T0 + i * MINUTE_MS, v / 10.0);
            tripled.insert(T0 + i * MINUTE_MS, v * 3.0);
        }
        assert_eq!(detect_divisor(&plain), 1.0);
        assert_eq!(detect_divisor(&tenths), 10.0);
        assert_eq!(detect_divisor(&tripled), 1.0);
    }
}
