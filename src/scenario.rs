//! Scenario assembly: driving signals, initial state and a complete run.

use log::{debug, info};

use crate::config::{ScenarioConfig, ScenarioKind};
use crate::control::limits::{Corrected, Correction};
use crate::control::{Characteristic, Timing};
use crate::error::SimError;
use crate::grid::GridModel;
use crate::sim::engine::Engine;
use crate::sim::kpi::RunSummary;
use crate::sim::signal::Profile;
use crate::sim::types::{ControllerState, SimConfig, StepResult, TargetPolicy};

/// Output of one scenario run.
#[derive(Debug, Clone)]
pub struct ScenarioRun {
    pub kind: ScenarioKind,
    pub policy: TargetPolicy,
    /// Characteristic after clamping, centred on the nominal reference.
    pub characteristic: Characteristic,
    /// Timing after clamping.
    pub timing: Timing,
    pub sim: SimConfig,
    /// Every parameter correction, in the order it was applied.
    pub corrections: Vec<Correction>,
    pub results: Vec<StepResult>,
    pub summary: RunSummary,
    /// Outcome of the configured threshold, if any and if `Q(Tref)` was sampled.
    pub conformance: Option<bool>,
}

/// Builds the engine for `config` with signals and initial state in place.
///
/// Corrections from the characteristic, the timing and the initial reference
/// are merged in that order.
///
/// # Errors
///
/// Returns a [`SimError`] for any fatal precondition.
pub fn prepare(config: &ScenarioConfig) -> Result<Corrected<Engine>, SimError> {
    let Corrected {
        value: characteristic,
        mut corrections,
    } = Characteristic::build(&config.volt_var.params())?;
    let Corrected {
        value: timing,
        corrections: timing_corrections,
    } = config.aarv.timing().validated()?;
    corrections.extend(timing_corrections);

    let horizon_s = config.simulation.horizon_s(&timing);
    let sim = SimConfig::new(config.simulation.dt_s, horizon_s)?;
    let grid = config.grid.model();
    let (power, v_src, initial) = drive(config, &characteristic, &grid, &timing)?;
    debug!(
        "{} scenario: grid r={:.5} x={:.5} pu, initial v_ref={:.4} q={:.4}",
        config.simulation.scenario, grid.r_pu, grid.x_pu, initial.v_ref, initial.q
    );

    let Corrected {
        value: engine,
        corrections: engine_corrections,
    } = Engine::new(
        sim,
        characteristic,
        grid,
        config.simulation.policy,
        timing,
        power,
        v_src,
        initial,
    )?;
    corrections.extend(engine_corrections);

    Ok(Corrected {
        value: engine,
        corrections,
    })
}

/// Driving signals `(P, Vsrc)` and the initial controller state for the scenario shape.
fn drive(
    config: &ScenarioConfig,
    characteristic: &Characteristic,
    grid: &GridModel,
    timing: &Timing,
) -> Result<(Profile, Profile, ControllerState), SimError> {
    let center = characteristic.center();
    let v_init = config.aarv.v_init;

    match config.simulation.scenario {
        ScenarioKind::Step => {
            let step = &config.step;
            let v_target = step
                .v_target_pu
                .unwrap_or((characteristic.v1() + characteristic.v2()) / 2.0);
            let initial = ControllerState {
                v_ref: v_init.unwrap_or(center),
                q: 0.0,
            };
            Ok((
                Profile::constant(step.p_pu),
                Profile::constant(v_target),
                initial,
            ))
        }
        ScenarioKind::PowerRamp => {
            let ramp = &config.power_ramp;
            let initial = ControllerState {
                v_ref: v_init.unwrap_or(center),
                q: 0.0,
            };
            Ok((
                Profile::ramp(0.0, ramp.p_start_pu, ramp.ramp_s, ramp.p_end_pu),
                Profile::constant(ramp.v_src_pu),
                initial,
            ))
        }
        ScenarioKind::VsrcFluctuation => {
            let fl = &config.vsrc_fluctuation;
            let v_src = Profile::trapezoid(fl.v_base_pu, fl.v_peak_pu, fl.corners());
            let v_src0 = v_src.at(0.0);
            let initial = if timing.aarv_enabled() {
                let q = characteristic.params().q_bias;
                let v_ref = match v_init {
                    Some(v) => v,
                    None => grid.poi_voltage(fl.p_pu, q, v_src0)?.v_poc,
                };
                ControllerState { v_ref, q }
            } else {
                let v_ref = v_init.unwrap_or(center);
                let q = presettle(
                    characteristic,
                    grid,
                    fl.p_pu,
                    v_src0,
                    v_ref,
                    fl.presettle_iterations,
                )?;
                ControllerState { v_ref, q }
            };
            Ok((Profile::constant(fl.p_pu), v_src, initial))
        }
    }
}

/// Fixed-point iteration `Q = lookup(Vpoc(P, Q, Vsrc))` from `Q = 0` with a frozen reference.
///
/// # Errors
///
/// Returns [`SimError::SourceVoltage`] when `v_src <= 0`.
pub fn presettle(
    characteristic: &Characteristic,
    grid: &GridModel,
    p: f64,
    v_src: f64,
    v_ref: f64,
    iterations: usize,
) -> Result<f64, SimError> {
    let drift = characteristic.center() - v_ref;
    let mut q = 0.0;
    for _ in 0..iterations {
        let v_poc = grid.poi_voltage(p, q, v_src)?.v_poc;
        q = characteristic.lookup(v_poc + drift);
    }
    Ok(q)
}

/// Prepares and runs `config`, then summarises the result.
///
/// # Errors
///
/// Returns a [`SimError`] for any fatal precondition; nothing is simulated in
/// that case.
pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioRun, SimError> {
    let Corrected {
        value: mut engine,
        corrections,
    } = prepare(config)?;
    let kind = config.simulation.scenario;
    let sim = *engine.config();
    info!(
        "running {kind} scenario: {} steps of {} s, policy {}",
        sim.total_steps(),
        sim.dt_s,
        engine.policy()
    );

    let results = engine.run();
    let characteristic = engine.characteristic().clone();
    let timing = *engine.timing();
    let summary =
        RunSummary::from_results(&results, characteristic.q1(), timing.t_ref_s, sim.dt_s);
    let conformance = config
        .conformance
        .check()
        .and_then(|check| check.passes(&summary));
    info!(
        "finished {kind} scenario: peak |Q| {:.4} pu, final Vref {:.4} pu, {} correction(s)",
        summary.peak_abs_q_pu,
        summary.final_v_ref_pu,
        corrections.len()
    );

    Ok(ScenarioRun {
        kind,
        policy: engine.policy(),
        characteristic,
        timing,
        sim,
        corrections,
        results,
        summary,
        conformance,
    })
}
