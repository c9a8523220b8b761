//! Cache policy for computed day details.
//!
//! A finished calendar day never changes, so its detail is computed once and
//! served from storage forever after. The current day is still accumulating
//! samples and is always recomputed; the recomputation overwrites the cached
//! row so the day is already final when it rolls over.

use crate::db::{Store, DayDetail, SOURCE_CACHE};
use crate::tz::today_local_iso;
use crate::vbox::VendorSession;

use tracing::debug;

use super::{compute_day_detail, HistoryError};

/// Serve one device-day, computing it only when the cache cannot.
pub async fn get_or_compute_day_detail(
    session: &dyn VendorSession,
    store: &Store,
    box_id: &str,
    day_iso: &str,
) -> Result<DayDetail, HistoryError> {
    let is_today = day_iso == today_local_iso();

    if !is_today {
        if let Some(hit) = store.find_day_detail(box_id, day_iso)? {
            debug!(box_id, day_iso, "day detail served from cache");
            return Ok(hit);
        }
    }

    let mut fresh = compute_day_detail(session, box_id, day_iso).await?;

    let mut stored = fresh.clone();
    stored.source = SOURCE_CACHE.to_string();
    store.upsert_day_detail(&stored)?;

    if !is_today {
        fresh.source = SOURCE_CACHE.to_string();
    }
    Ok(fresh)
}
