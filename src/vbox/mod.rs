//! V-BOX/Wecon cloud API collaborator.
//!
//! The history pipeline never talks to the network itself; it consumes the
//! [`VendorSession`] trait, implemented for real use by [`VBoxClient`] and by
//! in-memory mocks in tests.

mod client;
mod keepalive;

pub use client::*;
pub use keepalive::*;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Vendor API error types.
#[derive(Error, Debug)]
pub enum VendorError {
    #[error("vendor HTTP error: {0}")]
    Http(String),
    #[error("vendor API error {code}: {msg}")]
    Api { code: i64, msg: String },
    #[error("malformed vendor response: {0}")]
    Decode(String),
}

/// One raw history sample as the vendor reports it.
///
/// Ephemeral input to the normalizer; never persisted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSample {
    /// Epoch ms, when the vendor provides it numerically.
    pub monitor_time: Option<i64>,
    /// Fallback textual timestamp, `YYYY-MM-DD HH:MM:SS[.fff]`.
    pub monitor_time_show: Option<String>,
    /// Raw value string; may carry comma decimals.
    pub value: Option<String>,
}

impl RawSample {
    /// Resolve the sample instant, preferring the numeric field.
    pub fn timestamp_ms(&self) -> Option<i64> {
        if let Some(t) = self.monitor_time {
            return Some(t);
        }
        let show = self.monitor_time_show.as_deref()?;
        for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
            if let Ok(dt) = NaiveDateTime::parse_from_str(show, fmt) {
                return Some(dt.and_utc().timestamp_millis());
            }
        }
        None
    }
}

/// A named signal exposed by a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    pub monitor_id: String,
    pub monitor_name: String,
}

/// A device ("box") registered with the vendor account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub box_id: String,
    pub name: String,
}

/// One page of history samples.
#[derive(Debug, Clone, Default)]
pub struct HistoryPage {
    pub list: Vec<RawSample>,
    pub total_page: u32,
}

/// Per-request vendor session the core computes against.
#[async_trait]
pub trait VendorSession: Send + Sync {
    /// All monitors of one device.
    async fn list_monitors(&self, box_id: &str) -> Result<Vec<MonitorInfo>, VendorError>;

    /// One page of history for a monitor over `[begin_ms, end_ms]`.
    async fn fetch_history_page(
        &self,
        monitor_id: &str,
        begin_ms: i64,
        end_ms: i64,
        page_index: u32,
        page_size: u32,
    ) -> Result<HistoryPage, VendorError>;

    /// All devices visible to the session.
    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, VendorError>;

    /// Current values for the given monitor names (all when empty).
    async fn realtime(
        &self,
        box_id: &str,
        keys: &[String],
    ) -> Result<serde_json::Map<String, serde_json::Value>, VendorError>;

    /// Liveness ping that keeps the device pushing data.
    async fn send_switch(&self, box_id: &str) -> Result<(), VendorError>;
}
