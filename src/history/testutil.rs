//! In-memory vendor fake shared by the history tests.

use crate::vbox::{DeviceInfo, HistoryPage, MonitorInfo, RawSample, VendorError, VendorSession};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockVendor {
    pub monitors: Vec<MonitorInfo>,
    pub devices: Vec<DeviceInfo>,
    pub samples: Mutex<HashMap<String, Vec<RawSample>>>,
    pub history_calls: AtomicU32,
}

impl MockVendor {
    pub fn monitor(id: &str, name: &str) -> MonitorInfo {
        MonitorInfo {
            monitor_id: id.to_string(),
            monitor_name: name.to_string(),
        }
    }

    pub fn reading(t: i64, value: &str) -> RawSample {
        RawSample {
            monitor_time: Some(t),
            monitor_time_show: None,
            value: Some(value.to_string()),
        }
    }

    pub fn set_samples(&self, monitor_id: &str, rows: Vec<RawSample>) {
        self.samples
            .lock()
            .unwrap()
            .insert(monitor_id.to_string(), rows);
    }

    pub fn calls(&self) -> u32 {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VendorSession for MockVendor {
    async fn list_monitors(&self, _box_id: &str) -> Result<Vec<MonitorInfo>, VendorError> {
        Ok(self.monitors.clone())
    }

    async fn fetch_history_page(
        &self,
        monitor_id: &str,
        begin_ms: i64,
        end_ms: i64,
        page_index: u32,
        page_size: u32,
    ) -> Result<HistoryPage, VendorError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let all = self
            .samples
            .lock()
            .unwrap()
            .get(monitor_id)
            .cloned()
            .unwrap_or_default();
        let in_range: Vec<RawSample> = all
            .into_iter()
            .filter(|r| {
                r.timestamp_ms()
                    .map_or(false, |t| t >= begin_ms && t <= end_ms)
            })
            .collect();
        let per = page_size.max(1) as usize;
        let total_page = in_range.len().div_ceil(per).max(1) as u32;
        let start = page_index.saturating_sub(1) as usize * per;
        let list = in_range.into_iter().skip(start).take(per).collect();
        Ok(HistoryPage { list, total_page })
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, VendorError> {
        Ok(self.devices.clone())
    }

    async fn realtime(
        &self,
        _box_id: &str,
        _keys: &[String],
    ) -> Result<serde_json::Map<String, serde_json::Value>, VendorError> {
        Ok(serde_json::Map::new())
    }

    async fn send_switch(&self, _box_id: &str) -> Result<(), VendorError> {
        Ok(())
    }
}
