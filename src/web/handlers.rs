//! HTTP request handlers.
//!
//! Every handler builds a per-request vendor session: the upstream dashboard
//! forwards its own vendor session id in the `x-vbox-sid` header, so two
//! users never share one session.

use super::AppState;
use crate::history::{build_series_for_range, get_or_compute_day_detail, HistoryError};
use crate::vbox::{VBoxClient, VendorError, VendorSession};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

fn session_for(state: &AppState, headers: &HeaderMap) -> VBoxClient {
    let client = VBoxClient::new(
        &state.config.vbox_comid,
        &state.config.vbox_comkey,
        &state.config.vbox_region,
    );
    match headers.get("x-vbox-sid").and_then(|v| v.to_str().ok()) {
        Some(sid) => client.with_sid(sid),
        None => client,
    }
}

fn error_response(err: HistoryError) -> axum::response::Response {
    let status = match &err {
        HistoryError::CounterNotFound(_) => StatusCode::NOT_FOUND,
        HistoryError::InvalidDay(_) => StatusCode::BAD_REQUEST,
        HistoryError::Vendor(_) => StatusCode::BAD_GATEWAY,
        HistoryError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        error!("history request failed: {}", err);
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

// ============================================================================
// API: History
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesQuery {
    pub box_id: String,
    pub start: String,
    pub end: String,
    /// Optional display-name hint; skips the vendor device lookup.
    #[serde(default)]
    pub name: Option<String>,
}

pub async fn handle_get_series(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<SeriesQuery>,
) -> impl IntoResponse {
    let session = session_for(&state, &headers);
    match build_series_for_range(
        &session,
        &state.store,
        &query.box_id,
        &query.start,
        &query.end,
        query.name,
    )
    .await
    {
        Ok(series) => Json(series).into_response(),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayDetailQuery {
    pub box_id: String,
    /// Local calendar date, `YYYY-MM-DD`.
    pub day: String,
}

pub async fn handle_get_day_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DayDetailQuery>,
) -> impl IntoResponse {
    let session = session_for(&state, &headers);
    match get_or_compute_day_detail(&session, &state.store, &query.box_id, &query.day).await {
        Ok(detail) => Json(detail).into_response(),
        Err(e) => error_response(e),
    }
}

pub async fn handle_get_meta(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_machines() {
        Ok(machines) => Json(machines).into_response(),
        Err(e) => error_response(HistoryError::Db(e)),
    }
}

// ============================================================================
// API: Realtime
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeQuery {
    pub box_id: String,
    /// Comma-separated monitor names; empty means all.
    #[serde(default)]
    pub keys: Option<String>,
}

pub async fn handle_get_realtime(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<RealtimeQuery>,
) -> impl IntoResponse {
    let session = session_for(&state, &headers);

    // Nudge the box to keep pushing; throttled per device.
    state.keepalive.keep_alive(&session, &query.box_id).await;

    let keys: Vec<String> = query
        .keys
        .as_deref()
        .unwrap_or("")
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();

    match session.realtime(&query.box_id, &keys).await {
        Ok(values) => Json(serde_json::Value::Object(values)).into_response(),
        Err(e @ VendorError::Api { .. }) | Err(e @ VendorError::Http(_)) => {
            (StatusCode::BAD_GATEWAY, Json(json!({ "error": e.to_string() }))).into_response()
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response(),
    }
}
