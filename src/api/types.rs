//! API response and query types.
//!
//! Telemetry field names follow the CSV export columns.

use serde::{Deserialize, Serialize};

use crate::config::ScenarioConfig;
use crate::control::Correction;
use crate::sim::kpi::RunSummary;
use crate::sim::types::StepResult;

/// Combined state response: config, summary, and latest telemetry record.
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub config: ScenarioConfig,
    pub summary: RunSummary,
    /// Last recorded step, absent for an empty run.
    pub latest_step: Option<TelemetryRecord>,
}

/// Single telemetry record using the CSV column names.
#[derive(Debug, Serialize)]
pub struct TelemetryRecord {
    pub step: usize,
    pub time_s: f64,
    pub p_pu: f64,
    pub q_pu: f64,
    pub vsrc_pu: f64,
    pub vpoc_pu: f64,
    pub vref_pu: f64,
    pub verr_pu: f64,
    pub qtarg_pu: f64,
}

impl From<&StepResult> for TelemetryRecord {
    fn from(r: &StepResult) -> Self {
        Self {
            step: r.step,
            time_s: r.time_s,
            p_pu: r.p_pu,
            q_pu: r.q_pu,
            vsrc_pu: r.v_src_pu,
            vpoc_pu: r.v_poc_pu,
            vref_pu: r.v_ref_pu,
            verr_pu: r.v_err_pu,
            qtarg_pu: r.q_target_pu,
        }
    }
}

/// One point of the breakpoint table.
#[derive(Debug, Serialize)]
pub struct BreakpointRecord {
    /// `VL`, `V1` .. `V4` or `VH`.
    pub label: &'static str,
    pub v_pu: f64,
    pub q_pu: f64,
}

/// Breakpoint table together with the corrections applied while building the run.
#[derive(Debug, Serialize)]
pub struct CharacteristicResponse {
    pub breakpoints: Vec<BreakpointRecord>,
    pub corrections: Vec<Correction>,
}

/// Optional range query parameters for the telemetry endpoint.
#[derive(Debug, Deserialize)]
pub struct TelemetryQuery {
    /// Start step (inclusive).
    pub from: Option<usize>,
    /// End step (inclusive).
    pub to: Option<usize>,
}

/// Error response body for 400-class errors.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Human-readable error message.
    pub error: String,
}
