//! Signed HTTP client for the V-BOX/Wecon cloud API.

use super::{DeviceInfo, HistoryPage, MonitorInfo, RawSample, VendorError, VendorSession};

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

const DEFAULT_SECRET_KEY: &str = "f1cd9351930d4e589922edbcf3b09a7c";

fn region_base(region: &str) -> &'static str {
    match region {
        "cn" => "http://api.v-box.net",
        "asean" => "http://api.asean.v-box.net",
        _ => "http://api.eu.v-box.net",
    }
}

/// Vendor timestamps go on the wire as `YYYY-MM-DD HH:MM:SS.mmm` (UTC).
fn format_wecon_time(ms: i64) -> String {
    match DateTime::from_timestamp_millis(ms) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => String::new(),
    }
}

fn md5_hex(s: &str) -> String {
    format!("{:x}", md5::compute(s.as_bytes()))
}

/// The request signature is the MD5 of all non-empty params sorted by key,
/// joined `k=v` with `&`, with the shared secret appended.
fn build_sign(params: &BTreeMap<String, String>, secret_key: &str) -> String {
    let base = params
        .iter()
        .filter(|(_, v)| !v.is_empty())
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");
    md5_hex(&format!("{}&key={}", base, secret_key))
}

fn value_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Authenticated session against one vendor region.
#[derive(Debug, Clone)]
pub struct VBoxClient {
    base_url: String,
    comid: String,
    comkey: String,
    secret_key: String,
    sid: Option<String>,
    http: reqwest::Client,
}

impl VBoxClient {
    pub fn new(comid: &str, comkey: &str, region: &str) -> Self {
        Self {
            base_url: region_base(region).to_string(),
            comid: comid.trim().to_string(),
            comkey: comkey.trim().to_string(),
            secret_key: DEFAULT_SECRET_KEY.to_string(),
            sid: None,
            http: reqwest::Client::new(),
        }
    }

    /// Attach the per-request session id (`x-vbox-sid` header upstream).
    pub fn with_sid(mut self, sid: &str) -> Self {
        let sid = sid.trim();
        self.sid = if sid.is_empty() {
            None
        } else {
            Some(sid.to_string())
        };
        self
    }

    async fn post(
        &self,
        acturl: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<Value, VendorError> {
        let ts = chrono::Utc::now().timestamp_millis().to_string();

        let mut sign_params = params.clone();
        sign_params.insert("comid".into(), self.comid.clone());
        sign_params.insert("compvtkey".into(), self.comkey.clone());
        sign_params.insert("ts".into(), ts.clone());
        if let Some(sid) = &self.sid {
            sign_params.insert("sid".into(), sid.clone());
        }
        let sign = build_sign(&sign_params, &self.secret_key);

        let mut common = Map::new();
        for (k, v) in &sign_params {
            common.insert(k.clone(), json!(v));
        }
        common.insert("sign".into(), json!(sign));

        let url = format!("{}/box-data/api/{}", self.base_url, acturl);
        let query: Vec<(&str, &str)> = params
            .iter()
            .filter(|(_, v)| !v.is_empty())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let resp = self
            .http
            .post(&url)
            .query(&query)
            .header("common", Value::Object(common).to_string())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .send()
            .await
            .map_err(|e| VendorError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(VendorError::Http(format!("HTTP {}", resp.status())));
        }

        let data: Value = resp
            .json()
            .await
            .map_err(|e| VendorError::Decode(e.to_string()))?;

        let code = data.get("code").and_then(Value::as_i64).unwrap_or(-1);
        if code != 200 {
            let msg = data
                .get("msg")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            return Err(VendorError::Api { code, msg });
        }

        Ok(data.get("result").cloned().unwrap_or(Value::Null))
    }
}

fn row_string(row: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| row.get(*k).and_then(value_to_string))
}

#[async_trait]
impl VendorSession for VBoxClient {
    async fn list_monitors(&self, box_id: &str) -> Result<Vec<MonitorInfo>, VendorError> {
        let mut params = BTreeMap::new();
        params.insert("boxId".into(), box_id.to_string());
        let result = self.post("we-data/monitors", &params).await?;

        let rows = result.get("list").and_then(Value::as_array);
        let mut out = Vec::new();
        for row in rows.into_iter().flatten() {
            let id = row_string(row, &["monitorId", "id"]);
            let name = row_string(row, &["monitorName", "name"]);
            if let (Some(monitor_id), Some(monitor_name)) = (id, name) {
                out.push(MonitorInfo {
                    monitor_id,
                    monitor_name,
                });
            }
        }
        Ok(out)
    }

    async fn fetch_history_page(
        &self,
        monitor_id: &str,
        begin_ms: i64,
        end_ms: i64,
        page_index: u32,
        page_size: u32,
    ) -> Result<HistoryPage, VendorError> {
        let mut params = BTreeMap::new();
        params.insert("monitorId".into(), monitor_id.to_string());
        params.insert("monitorBeginTime".into(), format_wecon_time(begin_ms));
        params.insert("monitorEndTime".into(), format_wecon_time(end_ms));
        params.insert("pageIndex".into(), page_index.to_string());
        params.insert("pageSize".into(), page_size.to_string());
        let result = self.post("we-data/historydata", &params).await?;

        let rows = result.get("list").and_then(Value::as_array);
        let mut list = Vec::new();
        for row in rows.into_iter().flatten() {
            list.push(RawSample {
                monitor_time: row.get("monitorTime").and_then(Value::as_i64),
                monitor_time_show: row
                    .get("monitorTime_show")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                value: row.get("value").and_then(value_to_string),
            });
        }

        let total_page = result
            .get("totalPage")
            .and_then(Value::as_u64)
            .unwrap_or(1)
            .max(1) as u32;

        Ok(HistoryPage { list, total_page })
    }

    async fn list_devices(&self) -> Result<Vec<DeviceInfo>, VendorError> {
        let result = self.post("we-data/boxs", &BTreeMap::new()).await?;

        // Devices come back grouped; flatten every group's boxList.
        let groups = result
            .get("list")
            .or_else(|| result.pointer("/result/list"))
            .and_then(Value::as_array);

        let mut out = Vec::new();
        for group in groups.into_iter().flatten() {
            let boxes = group.get("boxList").and_then(Value::as_array);
            for b in boxes.into_iter().flatten() {
                if let Some(box_id) = row_string(b, &["boxId"]) {
                    let name = row_string(b, &["boxName"]).unwrap_or_else(|| box_id.clone());
                    out.push(DeviceInfo { box_id, name });
                }
            }
        }
        Ok(out)
    }

    async fn realtime(
        &self,
        box_id: &str,
        keys: &[String],
    ) -> Result<Map<String, Value>, VendorError> {
        let mut params = BTreeMap::new();
        params.insert("boxId".into(), box_id.to_string());
        params.insert("keys".into(), keys.join(","));
        let result = self.post("we-data/realdata", &params).await?;

        let mut out = Map::new();
        if let Some(rows) = result.get("list").and_then(Value::as_array) {
            for row in rows {
                let key = row_string(row, &["monitorName", "name", "key", "monitorId"]);
                let val = row.get("value").or_else(|| row.get("val"));
                if let (Some(k), Some(v)) = (key, val) {
                    out.insert(k, v.clone());
                }
            }
        }
        if let Some(map) = result.get("map").and_then(Value::as_object) {
            out.extend(map.clone());
        }
        Ok(out)
    }

    async fn send_switch(&self, box_id: &str) -> Result<(), VendorError> {
        let mut params = BTreeMap::new();
        params.insert("boxId".into(), box_id.to_string());
        self.post("we-data/sendSwitchToDevice", &params).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sign_sorted_and_filtered() {
        let mut params = BTreeMap::new();
        params.insert("boxId".to_string(), "42".to_string());
        params.insert("comid".to_string(), "acme".to_string());
        params.insert("empty".to_string(), String::new());
        let sign = build_sign(&params, "secret");
        // Empty params are excluded from the sign string.
        assert_eq!(sign, md5_hex("boxId=42&comid=acme&key=secret"));
        assert_eq!(sign.len(), 32);
    }

    #[test]
    fn test_format_wecon_time() {
        // 2024-06-10 12:30:00.250 UTC
        let ms = chrono::NaiveDate::from_ymd_opt(2024, 6, 10)
            .unwrap()
            .and_hms_milli_opt(12, 30, 0, 250)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(format_wecon_time(ms), "2024-06-10 12:30:00.250");
    }

    #[test]
    fn test_region_base() {
        assert_eq!(region_base("cn"), "http://api.v-box.net");
        assert_eq!(region_base("eu"), "http://api.eu.v-box.net");
        // Unknown regions fall back to eu.
        assert_eq!(region_base("mars"), "http://api.eu.v-box.net");
    }

    #[test]
    fn test_with_sid_trims_empty() {
        let c = VBoxClient::new("id", "key", "eu").with_sid("  ");
        assert!(c.sid.is_none());
        let c = VBoxClient::new("id", "key", "eu").with_sid("abc");
        assert_eq!(c.sid.as_deref(), Some("abc"));
    }
}
