//! Per-day production series over a contiguous date range.

use crate::db::{RangeSeries, SeriesEntry, Store};
use crate::tz::{day_label, list_days_iso};
use crate::vbox::VendorSession;

use tracing::warn;

use super::{get_or_compute_day_detail, HistoryError};

const SERIES_NAME: &str = "Contador del día";

/// Resolve the device's display name, preferring the caller's hint.
///
/// The device list is a nicety: when the vendor cannot produce it the series
/// still renders, just unnamed.
async fn resolve_machine_name(
    session: &dyn VendorSession,
    box_id: &str,
    name_hint: Option<String>,
) -> Option<String> {
    if name_hint.is_some() {
        return name_hint;
    }
    match session.list_devices().await {
        Ok(devices) => devices
            .into_iter()
            .find(|d| d.box_id == box_id)
            .map(|d| d.name),
        Err(err) => {
            warn!(box_id, %err, "device list unavailable, series stays unnamed");
            None
        }
    }
}

/// Build the chart series for one device over `[start_iso, end_iso]`.
///
/// A day the vendor cannot reconstruct charts as zero rather than failing
/// the whole range; storage failures still propagate, since they would
/// silently zero days that are in fact cached.
pub async fn build_series_for_range(
    session: &dyn VendorSession,
    store: &Store,
    box_id: &str,
    start_iso: &str,
    end_iso: &str,
    name_hint: Option<String>,
) -> Result<RangeSeries, HistoryError> {
    let days = list_days_iso(start_iso, end_iso);
    if days.is_empty() {
        return Err(HistoryError::InvalidDay(format!(
            "{start_iso}..{end_iso}"
        )));
    }

    let mut labels = Vec::with_capacity(days.len());
    let mut data = Vec::with_capacity(days.len());
    for day in &days {
        labels.push(day_label(day));
        match get_or_compute_day_detail(session, store, box_id, day).await {
            Ok(detail) => data.push(detail.contador_dia_ticks),
            Err(err @ HistoryError::Db(_)) => return Err(err),
            Err(err) => {
                warn!(box_id, day, %err, "day unavailable, charting zero");
                data.push(0);
            }
        }
    }

    let machine_name = resolve_machine_name(session, box_id, name_hint).await;
    let initial_counter = match &machine_name {
        Some(name) => store.find_initial_counter(name)?.unwrap_or(0.0),
        None => 0.0,
    };

    Ok(RangeSeries {
        labels,
        series: vec![SeriesEntry {
            name: SERIES_NAME.to_string(),
            data,
        }],
        initial_counter,
        machine_name,
    })
}
