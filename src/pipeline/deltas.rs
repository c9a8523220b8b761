//! Per-minute production deltas, production-window detection and run
//! intervals.

use super::{MinuteDeltaMap, MinuteMap};
use crate::tz::{minute_range_utc, DayBounds, MINUTE_MS};

use std::collections::BTreeMap;

/// A maximal contiguous span of minutes with positive delta. `end_ms` is the
/// minute after the last positive one (the minute that closed the run), or
/// the day-end boundary when the run reaches day's end, so `[start_ms,
/// end_ms)` always covers every producing minute of the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinuteSpan {
    pub start_ms: i64,
    pub end_ms: i64,
}

/// First and last positive-delta minutes of the local day, UTC instants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProductionWindow {
    pub first_on: Option<i64>,
    pub last_off: Option<i64>,
}

/// Derive per-minute deltas from consecutive counter readings.
///
/// The earliest reading has no predecessor and yields no delta. Negative or
/// non-finite differences (counter resets, transmission noise) clamp to zero
/// so every delta is non-negative.
pub fn build_minute_deltas(map: &MinuteMap, divisor: f64) -> MinuteDeltaMap {
    let divisor = if divisor > 0.0 { divisor } else { 1.0 };
    let mut out = BTreeMap::new();
    let mut prev: Option<(i64, f64)> = None;
    for (&t, &v) in map {
        if let Some((_, pv)) = prev {
            let mut dv = v - pv;
            if !dv.is_finite() || dv <= 0.0 {
                dv = 0.0;
            }
            out.insert(t, dv / divisor);
        }
        prev = Some((t, v));
    }
    out
}

fn day_minutes(bounds: &DayBounds) -> Vec<i64> {
    minute_range_utc(bounds.year, bounds.month, bounds.day, 0, 24)
}

/// Scan the local day for the first and last minutes with positive delta.
///
/// No configured shift hours exist; the window is whatever the counter
/// actually did.
pub fn detect_production_window(deltas: &MinuteDeltaMap, bounds: &DayBounds) -> ProductionWindow {
    let mut window = ProductionWindow::default();
    for t in day_minutes(bounds) {
        if deltas.get(&t).copied().unwrap_or(0.0) > 0.0 {
            if window.first_on.is_none() {
                window.first_on = Some(t);
            }
            window.last_off = Some(t);
        }
    }
    window
}

/// Build the maximal runs of consecutive positive-delta minutes.
pub fn build_run_intervals(deltas: &MinuteDeltaMap, bounds: &DayBounds) -> Vec<MinuteSpan> {
    let mins = day_minutes(bounds);
    let mut out = Vec::new();
    let mut cur_start: Option<i64> = None;

    for &t in &mins {
        let dv = deltas.get(&t).copied().unwrap_or(0.0);
        if dv > 0.0 {
            cur_start.get_or_insert(t);
        } else if let Some(start_ms) = cur_start.take() {
            out.push(MinuteSpan { start_ms, end_ms: t });
        }
    }
    // A run still open at day's end closes at the day boundary, keeping its
    // last producing minute inside the half-open span.
    if let (Some(start_ms), Some(&last)) = (cur_start, mins.last()) {
        out.push(MinuteSpan {
            start_ms,
            end_ms: last + MINUTE_MS,
        });
    }
    out
}

/// Total production for the local day, rounded to the nearest tick.
pub fn sum_day_ticks(deltas: &MinuteDeltaMap, bounds: &DayBounds) -> i64 {
    let sum: f64 = day_minutes(bounds)
        .iter()
        .map(|t| deltas.get(t).copied().unwrap_or(0.0))
        .sum();
    sum.round() as i64
}

/// Production inside one run, summing the deltas of `[start_ms, end_ms)`.
///
/// Including the opening minute and excluding the closing one means the
/// per-interval ticks partition the day total exactly.
pub fn span_produced_ticks(deltas: &MinuteDeltaMap, span: &MinuteSpan) -> i64 {
    let sum: f64 = deltas
        .range(span.start_ms..span.end_ms)
        .map(|(_, dv)| dv)
        .sum();
    sum.round() as i64
}
