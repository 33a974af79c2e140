//! REST API over a finished run.
//!
//! Provides three GET endpoints:
//! - `/state`: scenario config, run summary, and latest step
//! - `/telemetry`: full step results with optional range filtering
//! - `/characteristic`: breakpoint table and parameter corrections

mod handlers;
mod types;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use log::info;

use crate::config::ScenarioConfig;
use crate::control::{Characteristic, Correction};
use crate::scenario::ScenarioRun;
use crate::sim::kpi::RunSummary;
use crate::sim::types::StepResult;

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the run completes and wrapped in `Arc`; all data
/// is read-only so no locks are needed.
pub struct AppState {
    /// Scenario configuration used for this run.
    pub config: ScenarioConfig,
    pub summary: RunSummary,
    /// Characteristic after clamping.
    pub characteristic: Characteristic,
    pub corrections: Vec<Correction>,
    /// Per-step simulation results.
    pub results: Vec<StepResult>,
}

impl AppState {
    pub fn from_run(config: ScenarioConfig, run: ScenarioRun) -> Self {
        Self {
            config,
            summary: run.summary,
            characteristic: run.characteristic,
            corrections: run.corrections,
            results: run.results,
        }
    }
}

/// Builds the axum router with all API routes.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/state", get(handlers::get_state))
        .route("/telemetry", get(handlers::get_telemetry))
        .route("/characteristic", get(handlers::get_characteristic))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process ends.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind to `addr` or the
/// server stops with an error.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("API server listening on http://{addr}");
    axum::serve(listener, app).await
}
