//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;

use super::AppState;
use super::types::{
    BreakpointRecord, CharacteristicResponse, ErrorResponse, StateResponse, TelemetryQuery,
    TelemetryRecord,
};
use crate::control::characteristic::BREAKPOINT_LABELS;

/// Returns scenario config, run summary, and latest telemetry record.
///
/// `GET /state` → 200 + `StateResponse` JSON
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(StateResponse {
        config: state.config.clone(),
        summary: state.summary.clone(),
        latest_step: state.results.last().map(TelemetryRecord::from),
    })
}

/// Returns telemetry records, optionally filtered by step range.
///
/// `GET /telemetry` → 200 + `Vec<TelemetryRecord>` JSON
/// `GET /telemetry?from=N&to=M` → filtered range (inclusive)
/// `GET /telemetry?from=10&to=5` → 400 + `ErrorResponse`
pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TelemetryQuery>,
) -> impl IntoResponse {
    let from = query.from.unwrap_or(0);
    let to = query.to.unwrap_or(usize::MAX);

    if from > to {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("`from` ({from}) must be <= `to` ({to})"),
            }),
        ));
    }

    let records: Vec<TelemetryRecord> = state
        .results
        .iter()
        .filter(|r| r.step >= from && r.step <= to)
        .map(TelemetryRecord::from)
        .collect();

    Ok(Json(records))
}

/// Returns the breakpoint table and the parameter corrections.
///
/// `GET /characteristic` → 200 + `CharacteristicResponse` JSON
pub async fn get_characteristic(
    State(state): State<Arc<AppState>>,
) -> Json<CharacteristicResponse> {
    let v = state.characteristic.voltages();
    let q = state.characteristic.reactive();
    let breakpoints = BREAKPOINT_LABELS
        .iter()
        .enumerate()
        .map(|(i, &label)| BreakpointRecord {
            label,
            v_pu: v[i],
            q_pu: q[i],
        })
        .collect();

    Json(CharacteristicResponse {
        breakpoints,
        corrections: state.corrections.clone(),
    })
}
