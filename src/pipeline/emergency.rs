//! Emergency-signal attribution against production run intervals.

use super::normalize::parse_locale_number;
use super::MinuteSpan;
use crate::tz::{local_to_utc_ms, to_minute, DayBounds, MINUTE_MS};
use crate::vbox::RawSample;

use std::collections::BTreeMap;

/// Forward-filled on/off state per minute of the local day.
pub type EmergencyMinuteMap = BTreeMap<i64, u8>;

/// Whole-day emergency totals, restricted to production time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmergencyStats {
    /// Minutes with the signal high inside some run interval.
    pub minutes: i64,
    /// Rising edges whose transition minute falls inside a run interval.
    pub events: i64,
}

/// Expand sparse emergency samples to one 0/1 value per minute.
///
/// The signal is level-triggered and reported only on change, so the last
/// known value persists; before the first sample of the day it is off.
pub fn fill_binary_per_minute(rows: &[RawSample], bounds: &DayBounds) -> EmergencyMinuteMap {
    let mut raw: BTreeMap<i64, u8> = BTreeMap::new();
    for row in rows {
        let Some(t) = row.timestamp_ms() else {
            continue;
        };
        let Some(v) = row.value.as_deref().and_then(parse_locale_number) else {
            continue;
        };
        raw.insert(to_minute(t), u8::from(v >= 0.5));
    }

    let start = local_to_utc_ms(bounds.year, bounds.month, bounds.day, 0, 0);
    let end = local_to_utc_ms(bounds.year, bounds.month, bounds.day, 24, 0);
    let mut out = BTreeMap::new();
    let mut last = 0u8;
    let mut t = start;
    while t < end {
        if let Some(&v) = raw.get(&t) {
            last = v;
        }
        out.insert(t, last);
        t += MINUTE_MS;
    }
    out
}

fn inside_any(t: i64, runs: &[MinuteSpan]) -> bool {
    runs.iter().any(|r| t >= r.start_ms && t < r.end_ms)
}

/// Whole-day emergency minutes and rising-edge events inside production.
pub fn emerg_stats(emer: &EmergencyMinuteMap, runs: &[MinuteSpan]) -> EmergencyStats {
    let mut stats = EmergencyStats::default();
    let mut prev = 0u8;
    for (&t, &v) in emer {
        if v == 1 && inside_any(t, runs) {
            stats.minutes += 1;
        }
        if prev == 0 && v == 1 && inside_any(t, runs) {
            stats.events += 1;
        }
        prev = v;
    }
    stats
}

/// Emergency minutes and rising edges restricted to one run interval.
///
/// The edge detector restarts at the interval boundary: a signal already
/// high when the run opens counts as one event for that run.
pub fn span_emergency(emer: &EmergencyMinuteMap, span: &MinuteSpan) -> (i64, i64) {
    let mut minutes = 0i64;
    let mut events = 0i64;
    let mut prev = 0u8;
    let mut t = span.start_ms;
    while t < span.end_ms {
        let v = emer.get(&t).copied().unwrap_or(0);
        if v == 1 {
            minutes += 1;
        }
        if prev == 0 && v == 1 {
            events += 1;
        }
        prev = v;
        t += MINUTE_MS;
    }
    (minutes, events)
}

/// Reconcile the whole-day event count against the per-interval sum.
///
/// When the two disagree (edge adjacency at interval boundaries) the
/// per-interval sum wins; this matches what the interval table shows and is
/// deliberately kept that way.
pub fn reconcile_event_count(day_events: i64, per_interval_sum: i64) -> i64 {
    if per_interval_sum != day_events {
        per_interval_sum
    } else {
        day_events
    }
}
