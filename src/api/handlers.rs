//! API route handlers
//!
//! Request handling for the turbine dashboard:
//! - Current telemetry (read, replace, CSV import/export)
//! - On-demand prediction and explanation
//! - Sampling Loop control
//! - Verdict history and CSV export

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::dispatch::{DispatchError, Dispatcher};
use crate::pipeline::{AppState, SamplingLoop, SamplingStats};
use crate::telemetry_csv;
use crate::types::{HistoryEntry, TelemetryRecord};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Application state shared with the Sampling Loop
    pub app_state: Arc<RwLock<AppState>>,
    /// Scoring front door for manual predictions
    pub dispatcher: Arc<Dispatcher>,
    /// Start/stop handle for periodic sampling
    pub sampling: Arc<SamplingLoop>,
}

impl DashboardState {
    pub fn new(
        app_state: Arc<RwLock<AppState>>,
        dispatcher: Arc<Dispatcher>,
        sampling: Arc<SamplingLoop>,
    ) -> Self {
        Self {
            app_state,
            dispatcher,
            sampling,
        }
    }
}

// ============================================================================
// Health / Status
// ============================================================================

/// Legacy health check response
#[derive(Debug, Serialize)]
pub struct LegacyHealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// GET /health - Plain liveness probe
pub async fn legacy_health_check(
    State(state): State<DashboardState>,
) -> Json<LegacyHealthResponse> {
    let app_state = state.app_state.read().await;
    Json(LegacyHealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: app_state.uptime_secs(),
    })
}

#[derive(Debug, Serialize)]
pub struct RemoteStatus {
    pub configured: bool,
    pub endpoint: Option<String>,
    pub reachable: bool,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub sampling_running: bool,
    pub sampling_interval_ms: u64,
    pub history_len: usize,
    pub history_capacity: usize,
    pub has_prediction: bool,
    pub uptime_secs: u64,
    pub remote: RemoteStatus,
    pub stats: SamplingStats,
}

/// GET /api/status - Sampling, history and remote scorer status
pub async fn get_status(State(state): State<DashboardState>) -> Response {
    // Probe before taking the lock; the remote may be slow.
    let reachable = state.dispatcher.remote_healthy().await;

    let app_state = state.app_state.read().await;
    ApiResponse::ok(StatusResponse {
        sampling_running: state.sampling.is_running(),
        sampling_interval_ms: u64::try_from(state.sampling.interval().as_millis())
            .unwrap_or(u64::MAX),
        history_len: app_state.history.len(),
        history_capacity: app_state.history.capacity(),
        has_prediction: app_state.prediction.is_some(),
        uptime_secs: app_state.uptime_secs(),
        remote: RemoteStatus {
            configured: state.dispatcher.has_remote(),
            endpoint: state.dispatcher.remote_endpoint().map(str::to_string),
            reachable,
        },
        stats: app_state.sampling.clone(),
    })
}

// ============================================================================
// Telemetry
// ============================================================================

/// GET /api/telemetry - Current telemetry record
pub async fn get_telemetry(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;
    ApiResponse::ok(&app_state.telemetry)
}

/// PUT /api/telemetry - Replace the current telemetry record
pub async fn put_telemetry(State(state): State<DashboardState>, body: Bytes) -> Response {
    let record = match parse_record(&body) {
        Ok(record) => record,
        Err(resp) => return resp,
    };

    let mut app_state = state.app_state.write().await;
    app_state.telemetry = record;
    ApiResponse::ok(&app_state.telemetry)
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub imported: usize,
    pub skipped: usize,
    pub records: Vec<TelemetryRecord>,
    /// Telemetry after the import (the last valid row).
    pub current: TelemetryRecord,
}

/// POST /api/telemetry/import - Load telemetry rows from a CSV body
pub async fn import_telemetry(State(state): State<DashboardState>, body: String) -> Response {
    let import = match telemetry_csv::parse_csv(&body) {
        Ok(import) => import,
        Err(e) => return ApiErrorResponse::bad_request(e.to_string()),
    };
    let Some(current) = import.last().cloned() else {
        return ApiErrorResponse::bad_request(format!(
            "CSV contained no valid rows ({} skipped)",
            import.skipped
        ));
    };

    state.app_state.write().await.telemetry = current.clone();
    info!(
        imported = import.records.len(),
        skipped = import.skipped,
        "Telemetry imported from CSV"
    );

    ApiResponse::ok(ImportResponse {
        imported: import.records.len(),
        skipped: import.skipped,
        records: import.records,
        current,
    })
}

/// GET /api/telemetry/export - Current telemetry as CSV
pub async fn export_telemetry(State(state): State<DashboardState>) -> Response {
    let record = state.app_state.read().await.telemetry.clone();
    match telemetry_csv::to_csv(std::slice::from_ref(&record)) {
        Ok(body) => csv_attachment(body, "turbine_telemetry.csv"),
        Err(e) => ApiErrorResponse::internal(format!("CSV export failed: {}", e)),
    }
}

// ============================================================================
// Prediction / Explanation
// ============================================================================

/// POST /api/predict - Score the given record, or current telemetry when the
/// body is empty. The verdict becomes the current prediction; history is
/// left to the Sampling Loop.
pub async fn predict(State(state): State<DashboardState>, body: Bytes) -> Response {
    let record = match resolve_record(&state, &body).await {
        Ok(record) => record,
        Err(resp) => return resp,
    };

    match state.dispatcher.predict(&record).await {
        Ok(verdict) => {
            state.app_state.write().await.prediction = Some(verdict.clone());
            ApiResponse::ok(verdict)
        }
        Err(e) => dispatch_error(e),
    }
}

/// GET /api/prediction - Latest verdict
pub async fn get_prediction(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;
    match &app_state.prediction {
        Some(verdict) => ApiResponse::ok(verdict),
        None => ApiErrorResponse::not_found("No prediction available yet"),
    }
}

/// POST /api/explain - Remote feature attribution for a record
pub async fn explain(State(state): State<DashboardState>, body: Bytes) -> Response {
    let record = match resolve_record(&state, &body).await {
        Ok(record) => record,
        Err(resp) => return resp,
    };

    match state.dispatcher.explain(&record).await {
        Ok(explanation) => ApiResponse::ok(explanation),
        Err(e) => dispatch_error(e),
    }
}

// ============================================================================
// Sampling Control
// ============================================================================

#[derive(Debug, Serialize)]
pub struct SamplingResponse {
    pub running: bool,
    /// False when the loop was already in the requested state.
    pub changed: bool,
}

/// POST /api/sampling/start
pub async fn start_sampling(State(state): State<DashboardState>) -> Response {
    let changed = state.sampling.start();
    ApiResponse::ok(SamplingResponse {
        running: state.sampling.is_running(),
        changed,
    })
}

/// POST /api/sampling/stop
pub async fn stop_sampling(State(state): State<DashboardState>) -> Response {
    let changed = state.sampling.stop().await;
    ApiResponse::ok(SamplingResponse {
        running: state.sampling.is_running(),
        changed,
    })
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub capacity: usize,
    pub count: usize,
    /// Oldest first.
    pub entries: Vec<HistoryEntry>,
}

/// GET /api/history
pub async fn get_history(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;
    let entries: Vec<HistoryEntry> = app_state.history.entries().cloned().collect();
    ApiResponse::ok(HistoryResponse {
        capacity: app_state.history.capacity(),
        count: entries.len(),
        entries,
    })
}

#[derive(Debug, Serialize)]
pub struct ClearHistoryResponse {
    pub cleared: usize,
}

/// DELETE /api/history
pub async fn clear_history(State(state): State<DashboardState>) -> Response {
    let mut app_state = state.app_state.write().await;
    let cleared = app_state.history.len();
    app_state.history.clear();
    info!(cleared, "History cleared");
    ApiResponse::ok(ClearHistoryResponse { cleared })
}

/// GET /api/history/export - History as CSV
pub async fn export_history(State(state): State<DashboardState>) -> Response {
    let app_state = state.app_state.read().await;
    match app_state.history.export() {
        Ok(body) => csv_attachment(body, "turbine_history.csv"),
        Err(e) => ApiErrorResponse::internal(e.to_string()),
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_record(body: &[u8]) -> Result<TelemetryRecord, Response> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ApiErrorResponse::bad_request(format!("Invalid JSON body: {}", e)))?;
    TelemetryRecord::from_json(value).map_err(|e| ApiErrorResponse::invalid_record(e.to_string()))
}

/// Record from the request body, or current telemetry for an empty body.
async fn resolve_record(state: &DashboardState, body: &[u8]) -> Result<TelemetryRecord, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(state.app_state.read().await.telemetry.clone());
    }
    parse_record(body)
}

fn dispatch_error(err: DispatchError) -> Response {
    match err {
        DispatchError::InvalidRecord(e) => ApiErrorResponse::invalid_record(e.to_string()),
        DispatchError::ExplanationUnavailable(msg) => {
            ApiErrorResponse::explanation_unavailable(msg)
        }
    }
}

fn csv_attachment(body: String, filename: &str) -> Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        body,
    )
        .into_response()
}
