//! Domain model types.
//!
//! Field names on the wire keep the dashboard's historical JSON contract
//! (camelCase with the original Spanish terms), so existing consumers of the
//! day-detail and range endpoints keep working unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance tag for a freshly computed day detail.
pub const SOURCE_FRESH: &str = "wecon";
/// Provenance tag for a day detail served from (or written to) the cache.
pub const SOURCE_CACHE: &str = "cache";

/// One contiguous production run within a day, with its emergency share.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInterval {
    /// First producing minute, epoch ms UTC.
    pub start: i64,
    /// Minute after the last producing one (the day-end boundary when the
    /// run reaches day's end), epoch ms UTC.
    pub end: i64,
    pub duration_min: i64,
    pub produced_ticks: i64,
    pub emer_min: i64,
    pub emer_count: i64,
}

/// Emergency totals inside production for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencySummary {
    /// Emergency events (rising edges).
    pub veces: i64,
    /// Minutes spent in emergency.
    pub minutos: i64,
}

/// Detected production window and run intervals for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub first_on: Option<i64>,
    pub last_off: Option<i64>,
    pub total_run_min: i64,
    pub intervals: Vec<RunInterval>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Averages {
    pub avg_per_hour: i64,
    pub avg_per_min: f64,
}

/// One production-window-clipped hourly bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourBin {
    /// `HH:MM` local wall-clock label of the bin boundary.
    pub label: String,
    pub produced: i64,
    pub cumulative: i64,
}

/// The unit of computation and caching: everything known about one device
/// on one local calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetail {
    pub box_id: String,
    /// Local calendar date, `YYYY-MM-DD`.
    pub day: String,
    pub emergencias: EmergencySummary,
    pub contador_dia_ticks: i64,
    pub run: RunSummary,
    pub averages: Averages,
    #[serde(rename = "bins1h")]
    pub bins_1h: Vec<HourBin>,
    pub computed_at: DateTime<Utc>,
    /// `"wecon"` when freshly computed, `"cache"` when served from storage.
    pub source: String,
}

/// One named series over a day range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesEntry {
    pub name: String,
    pub data: Vec<i64>,
}

/// Labeled per-day production over a contiguous date range. Fully derivable
/// from day details, so never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeSeries {
    pub labels: Vec<String>,
    pub series: Vec<SeriesEntry>,
    pub initial_counter: f64,
    pub machine_name: Option<String>,
}

/// Operator-maintained machine metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineMeta {
    pub machine_name: String,
    pub box_id: Option<String>,
    pub initial_counter: f64,
    pub company: Option<String>,
    pub provider: Option<String>,
    /// Season start, `YYYY-MM-DD`.
    pub start_date: Option<String>,
}
