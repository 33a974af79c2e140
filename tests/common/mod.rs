//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use aarv_sim::config::ScenarioConfig;
use aarv_sim::grid::GridModel;
use aarv_sim::scenario::{ScenarioRun, run_scenario};
use aarv_sim::sim::types::{StepResult, TargetPolicy};

/// Zero-deadband step test: K = 2.5, Q = +/-0.25, Tref = 300 s, Tresponse = 10 s.
pub fn zero_deadband_step() -> ScenarioConfig {
    ScenarioConfig::step()
}

/// Deadband step test: dB = 0.04, K = 22/3, Q = +/-0.44, Tresponse = 5 s.
pub fn deadband_step() -> ScenarioConfig {
    ScenarioConfig::step_deadband()
}

/// 1.210 + j2.8339 ohm on a 13.2 kV / 6 MVA base.
pub fn feeder_grid() -> GridModel {
    GridModel::from_ohms(13.2, 6.0, 1.210, 2.8339)
}

/// Runs `config` and panics on a fatal precondition.
pub fn run(config: &ScenarioConfig) -> ScenarioRun {
    run_scenario(config).unwrap_or_else(|e| panic!("scenario should run: {e}"))
}

/// Runs `config` once with each target policy.
pub fn run_both_policies(config: &ScenarioConfig) -> (ScenarioRun, ScenarioRun) {
    let mut offset = config.clone();
    offset.simulation.policy = TargetPolicy::Offset;
    let mut shift = config.clone();
    shift.simulation.policy = TargetPolicy::TableShift;
    (run(&offset), run(&shift))
}

/// Record closest to `time_s`.
pub fn at_time(results: &[StepResult], time_s: f64) -> &StepResult {
    results
        .iter()
        .min_by(|a, b| {
            (a.time_s - time_s)
                .abs()
                .total_cmp(&(b.time_s - time_s).abs())
        })
        .unwrap_or_else(|| panic!("no records"))
}
