//! Reconstruction of one device-day from raw vendor history.
//!
//! Monitors are discovered by name: devices expose their counter under
//! operator-chosen labels ("Contador General", "COUNTER", ...), so matching
//! normalizes the name and looks for a known alias as a substring.

use crate::db::{Averages, DayDetail, RunInterval, RunSummary, SOURCE_FRESH};
use crate::pipeline::{
    build_minute_deltas, build_run_intervals, collapse_to_minute_map, detect_divisor,
    detect_production_window, emerg_stats, fill_binary_per_minute, hourly_bins_dynamic,
    reconcile_event_count, span_emergency, span_produced_ticks, sum_day_ticks,
    EmergencyMinuteMap, EmergencyStats,
};
use crate::tz::{day_bounds_utc, DayBounds, MINUTE_MS};
use crate::vbox::{MonitorInfo, RawSample, VendorError, VendorSession};

use chrono::Utc;
use tracing::{debug, warn};

const COUNTER_ALIASES: [&str; 4] = ["CONTADOR GENERAL", "CONTADOR", "COUNTER", "TOTAL"];
const EMERGENCY_ALIASES: [&str; 4] = ["ESTADO EMERGENCIA", "EMERGENCIA", "EMERGENCY", "ALARMA"];

/// Samples slightly outside the day are fetched so the first in-day minute
/// has a predecessor to difference against.
const PAD_MS: i64 = 5 * MINUTE_MS;
const PAGE_SIZE: u32 = 500;

fn strip_accent(c: char) -> char {
    match c {
        'Á' => 'A',
        'É' => 'E',
        'Í' => 'I',
        'Ó' => 'O',
        'Ú' | 'Ü' => 'U',
        'Ñ' => 'N',
        _ => c,
    }
}

/// Uppercase, accent-stripped, whitespace-collapsed monitor name.
pub(crate) fn clean_name(name: &str) -> String {
    let upper: String = name.to_uppercase().chars().map(strip_accent).collect();
    upper.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pick the monitor matching one of the aliases, alphabetically first on
/// ties so repeated runs always select the same monitor.
fn find_monitor<'a>(monitors: &'a [MonitorInfo], aliases: &[&str]) -> Option<&'a MonitorInfo> {
    let mut hits: Vec<&MonitorInfo> = monitors
        .iter()
        .filter(|m| {
            let clean = clean_name(&m.monitor_name);
            aliases.iter().any(|a| clean.contains(a))
        })
        .collect();
    hits.sort_by(|a, b| a.monitor_name.cmp(&b.monitor_name));
    hits.first().copied()
}

/// Fetch every history page for one monitor over `[begin_ms, end_ms]`.
///
/// The first page is authoritative (its failure fails the day); later pages
/// are tolerated as missing so one flaky page degrades the day instead of
/// erroring it.
async fn get_all_history(
    session: &dyn VendorSession,
    monitor_id: &str,
    begin_ms: i64,
    end_ms: i64,
) -> Result<Vec<RawSample>, VendorError> {
    let first = session
        .fetch_history_page(monitor_id, begin_ms, end_ms, 1, PAGE_SIZE)
        .await?;
    let total = first.total_page;
    let mut rows = first.list;
    for page in 2..=total {
        match session
            .fetch_history_page(monitor_id, begin_ms, end_ms, page, PAGE_SIZE)
            .await
        {
            Ok(p) => rows.extend(p.list),
            Err(err) => {
                warn!(monitor_id, page, %err, "history page fetch failed, continuing without it");
            }
        }
    }
    rows.sort_by_key(|r| r.timestamp_ms().unwrap_or(i64::MAX));
    Ok(rows)
}

async fn fetch_emergency_map(
    session: &dyn VendorSession,
    monitor: Option<&MonitorInfo>,
    bounds: &DayBounds,
) -> EmergencyMinuteMap {
    let Some(monitor) = monitor else {
        return EmergencyMinuteMap::new();
    };
    match get_all_history(
        session,
        &monitor.monitor_id,
        bounds.begin_ms - PAD_MS,
        bounds.end_ms + PAD_MS,
    )
    .await
    {
        Ok(rows) => fill_binary_per_minute(&rows, bounds),
        Err(err) => {
            warn!(monitor_id = %monitor.monitor_id, %err, "emergency history unavailable, reporting zero");
            EmergencyMinuteMap::new()
        }
    }
}

/// Rebuild everything known about one device on one local calendar day.
pub async fn compute_day_detail(
    session: &dyn VendorSession,
    box_id: &str,
    day_iso: &str,
) -> Result<DayDetail, super::HistoryError> {
    let bounds = day_bounds_utc(day_iso)
        .ok_or_else(|| super::HistoryError::InvalidDay(day_iso.to_string()))?;

    let monitors = session.list_monitors(box_id).await?;
    let counter = find_monitor(&monitors, &COUNTER_ALIASES)
        .ok_or_else(|| super::HistoryError::CounterNotFound(box_id.to_string()))?;
    let emergency = find_monitor(&monitors, &EMERGENCY_ALIASES);

    let rows = get_all_history(
        session,
        &counter.monitor_id,
        bounds.begin_ms - PAD_MS,
        bounds.end_ms + PAD_MS,
    )
    .await?;
    debug!(box_id, day_iso, samples = rows.len(), "counter history fetched");

    let minute_map = collapse_to_minute_map(&rows);
    let divisor = detect_divisor(&minute_map);
    let deltas = build_minute_deltas(&minute_map, divisor);

    let window = detect_production_window(&deltas, &bounds);
    let runs = build_run_intervals(&deltas, &bounds);
    let ticks = sum_day_ticks(&deltas, &bounds);

    let emer_map = fetch_emergency_map(session, emergency, &bounds).await;
    let day_stats = if emer_map.is_empty() {
        EmergencyStats::default()
    } else {
        emerg_stats(&emer_map, &runs)
    };

    let mut intervals = Vec::with_capacity(runs.len());
    let mut total_run_min = 0i64;
    let mut interval_events = 0i64;
    for run in &runs {
        let duration_min = (run.end_ms - run.start_ms) / MINUTE_MS;
        let (emer_min, emer_count) = span_emergency(&emer_map, run);
        total_run_min += duration_min;
        interval_events += emer_count;
        intervals.push(RunInterval {
            start: run.start_ms,
            end: run.end_ms,
            duration_min,
            produced_ticks: span_produced_ticks(&deltas, run),
            emer_min,
            emer_count,
        });
    }

    let averages = if total_run_min > 0 {
        let per_min = ticks as f64 / total_run_min as f64;
        Averages {
            avg_per_hour: (per_min * 60.0).round() as i64,
            avg_per_min: (per_min * 10.0).round() / 10.0,
        }
    } else {
        Averages::default()
    };

    let mut emergencias = crate::db::EmergencySummary {
        veces: day_stats.events,
        minutos: day_stats.minutes,
    };
    emergencias.veces = reconcile_event_count(emergencias.veces, interval_events);

    let bins_1h = hourly_bins_dynamic(&deltas, &bounds, window.first_on, window.last_off);

    Ok(DayDetail {
        box_id: box_id.to_string(),
        day: day_iso.to_string(),
        emergencias,
        contador_dia_ticks: ticks,
        run: RunSummary {
            first_on: window.first_on,
            last_off: window.last_off,
            total_run_min,
            intervals,
        },
        averages,
        bins_1h,
        computed_at: Utc::now(),
        source: SOURCE_FRESH.to_string(),
    })
}
