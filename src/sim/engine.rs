//! Discrete-time volt-var control loop with autonomously adjusting reference.

use log::debug;

use crate::control::limits::{Corrected, V_REF_MAX, V_REF_MIN, clamp_reported};
use crate::control::{Characteristic, DecrementFactors, Timing};
use crate::error::{SimError, finite};
use crate::grid::{GridModel, PoiVoltage};

use super::clock::Clock;
use super::signal::Profile;
use super::types::{ControllerState, SimConfig, StepResult, TargetPolicy};

/// Simulation engine owning the characteristic, grid model, driving signals
/// and controller state for one run.
///
/// All preconditions are checked in [`Engine::new`]; stepping never fails.
pub struct Engine {
    config: SimConfig,
    characteristic: Characteristic,
    grid: GridModel,
    policy: TargetPolicy,
    timing: Timing,
    gains: DecrementFactors,
    power: Profile,
    v_src: Profile,
    state: ControllerState,
}

impl Engine {
    /// Creates a new engine.
    ///
    /// # Arguments
    ///
    /// * `config` - Step size and horizon
    /// * `characteristic` - Volt-var table centred on the nominal reference
    /// * `grid` - Per-unit impedance between source and DER
    /// * `policy` - How the target follows the adapted reference
    /// * `timing` - Validated AARV and open-loop time constants
    /// * `power` - Active-power injection P(t) in pu
    /// * `v_src` - Source voltage Vsrc(t) in pu
    /// * `initial` - Controller state at `t = 0`
    ///
    /// An initial reference outside the allowed band is clamped and reported.
    ///
    /// # Errors
    ///
    /// Fails if a signal is empty, if a signal or the initial state is not
    /// finite, or if the source voltage is not strictly positive everywhere.
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        config: SimConfig,
        characteristic: Characteristic,
        grid: GridModel,
        policy: TargetPolicy,
        timing: Timing,
        power: Profile,
        v_src: Profile,
        initial: ControllerState,
    ) -> Result<Corrected<Self>, SimError> {
        power.check_finite("p_pu")?;
        v_src.check_finite("v_src_pu")?;
        finite("grid.r_pu", grid.r_pu)?;
        finite("grid.x_pu", grid.x_pu)?;
        let v_src_min = v_src
            .min_value()
            .ok_or(SimError::EmptySignal { field: "v_src_pu" })?;
        if v_src_min <= 0.0 {
            return Err(SimError::SourceVoltage(v_src_min));
        }
        let q = finite("initial.q", initial.q)?;
        let v_ref = finite("initial.v_ref", initial.v_ref)?;

        let mut corrections = Vec::new();
        let v_ref = clamp_reported("aarv.v_init", v_ref, V_REF_MIN, V_REF_MAX, &mut corrections);
        let gains = DecrementFactors::new(config.dt_s, &timing);
        debug!(
            "engine: dt={}s horizon={}s steps={} inc_ref={:.3e} inc_ol={:.3e} policy={policy}",
            config.dt_s,
            config.horizon_s,
            config.total_steps(),
            gains.inc_ref,
            gains.inc_ol,
        );

        Ok(Corrected {
            value: Self {
                config,
                characteristic,
                grid,
                policy,
                timing,
                gains,
                power,
                v_src,
                state: ControllerState { v_ref, q },
            },
            corrections,
        })
    }

    /// Target reactive power for the measured voltage and current reference.
    fn target_q(&self, v_poc: f64, v_ref: f64) -> f64 {
        match self.policy {
            TargetPolicy::Offset => {
                let drift = self.characteristic.center() - v_ref;
                self.characteristic.lookup(v_poc + drift)
            }
            TargetPolicy::TableShift => self.characteristic.recentered(v_ref).lookup(v_poc),
        }
    }

    /// Executes step `step` at time `time_s` and advances the state.
    ///
    /// The record holds the state entering the step; the update it computes
    /// is visible in the next record.
    pub fn step(&mut self, step: usize, time_s: f64) -> StepResult {
        let p = self.power.at(time_s);
        let v_src = self.v_src.at(time_s);
        let ControllerState { v_ref, q } = self.state;

        // 1. Measured voltage from the current injection
        let PoiVoltage { v_poc, .. } = self.grid.poi_voltage_unchecked(p, q, v_src);
        let v_err = v_poc - v_ref;

        // 2. Target from the characteristic, using the reference entering the step
        let q_target = self.target_q(v_poc, v_ref);

        // 3. Slow reference adaptation and fast open-loop response
        self.state.v_ref = (v_ref + v_err * self.gains.inc_ref).clamp(V_REF_MIN, V_REF_MAX);
        self.state.q = q + (q_target - q) * self.gains.inc_ol;

        StepResult {
            step,
            time_s,
            p_pu: p,
            q_pu: q,
            v_src_pu: v_src,
            v_poc_pu: v_poc,
            v_ref_pu: v_ref,
            v_err_pu: v_err,
            q_target_pu: q_target,
        }
    }

    /// Executes all steps and returns the complete step record vector.
    pub fn run(&mut self) -> Vec<StepResult> {
        let total = self.config.total_steps();
        let mut results = Vec::with_capacity(total);
        let mut clock = Clock::new(total, self.config.dt_s);
        clock.run(|step, time_s| results.push(self.step(step, time_s)));
        results
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn characteristic(&self) -> &Characteristic {
        &self.characteristic
    }

    pub fn policy(&self) -> TargetPolicy {
        self.policy
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn gains(&self) -> &DecrementFactors {
        &self.gains
    }

    /// Controller state entering the next step.
    pub fn state(&self) -> &ControllerState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{DerCategory, VoltVarParams};

    fn characteristic() -> Characteristic {
        let params = VoltVarParams {
            v_ref: 1.0,
            deadband: 0.0,
            slope: 2.5,
            q_max: 0.25,
            q_min: -0.25,
            q_bias: 0.0,
            category: DerCategory::B,
        };
        Characteristic::build(&params).unwrap().value
    }

    fn engine(v_src: f64, timing: Timing, horizon_s: f64, policy: TargetPolicy) -> Engine {
        Engine::new(
            SimConfig::new(0.1, horizon_s).unwrap(),
            characteristic(),
            GridModel::stiff(),
            policy,
            timing,
            Profile::constant(0.0),
            Profile::constant(v_src),
            ControllerState { v_ref: 1.0, q: 0.0 },
        )
        .unwrap()
        .value
    }

    #[test]
    fn run_produces_horizon_plus_one_steps() {
        let mut e = engine(1.0, Timing::new(300.0, 10.0), 30.0, TargetPolicy::Offset);
        let results = e.run();
        assert_eq!(results.len(), 301);
        assert_eq!(results[0].time_s, 0.0);
        assert!((results[300].time_s - 30.0).abs() < 1e-9);
    }

    #[test]
    fn nominal_voltage_stays_at_rest() {
        let mut e = engine(1.0, Timing::new(300.0, 10.0), 60.0, TargetPolicy::Offset);
        for r in e.run() {
            assert_eq!(r.q_pu, 0.0);
            assert_eq!(r.v_ref_pu, 1.0);
            assert_eq!(r.v_err_pu, 0.0);
        }
    }

    #[test]
    fn first_step_records_initial_state() {
        let mut e = engine(0.95, Timing::new(300.0, 10.0), 1.0, TargetPolicy::Offset);
        let r = e.step(0, 0.0);
        assert_eq!(r.q_pu, 0.0);
        assert_eq!(r.v_ref_pu, 1.0);
        assert!((r.v_err_pu + 0.05).abs() < 1e-12);
        assert!((r.q_target_pu - 0.125).abs() < 1e-12);
        assert!(e.state().q > 0.0);
        assert!(e.state().v_ref < 1.0);
    }

    #[test]
    fn disabled_aarv_freezes_reference_and_settles_on_table() {
        let mut e = engine(0.95, Timing::new(0.0, 10.0), 200.0, TargetPolicy::Offset);
        let results = e.run();
        assert!(results.iter().all(|r| r.v_ref_pu == 1.0));
        let last = results.last().unwrap();
        assert!((last.q_pu - 0.125).abs() < 1e-6);
    }

    #[test]
    fn zero_response_time_tracks_target_next_step() {
        let mut e = engine(0.95, Timing::new(300.0, 0.0), 1.0, TargetPolicy::Offset);
        let results = e.run();
        for pair in results.windows(2) {
            assert!((pair[1].q_pu - pair[0].q_target_pu).abs() < 1e-12);
        }
    }

    #[test]
    fn policies_agree_step_by_step() {
        let timing = Timing::new(300.0, 10.0);
        let a = engine(0.95, timing, 300.0, TargetPolicy::Offset).run();
        let b = engine(0.95, timing, 300.0, TargetPolicy::TableShift).run();
        for (x, y) in a.iter().zip(&b) {
            assert!((x.q_pu - y.q_pu).abs() < 1e-9);
            assert!((x.v_ref_pu - y.v_ref_pu).abs() < 1e-9);
        }
    }

    #[test]
    fn reference_is_clamped_to_band() {
        let mut e = engine(1.3, Timing::new(300.0, 10.0), 3000.0, TargetPolicy::Offset);
        let results = e.run();
        assert!(results.iter().all(|r| r.v_ref_pu <= V_REF_MAX));
        assert_eq!(results.last().unwrap().v_ref_pu, V_REF_MAX);
    }

    #[test]
    fn out_of_band_initial_reference_is_corrected() {
        let built = Engine::new(
            SimConfig::new(0.1, 1.0).unwrap(),
            characteristic(),
            GridModel::stiff(),
            TargetPolicy::Offset,
            Timing::new(300.0, 10.0),
            Profile::constant(0.0),
            Profile::constant(1.0),
            ControllerState { v_ref: 0.9, q: 0.0 },
        )
        .unwrap();
        assert_eq!(built.value.state().v_ref, V_REF_MIN);
        assert_eq!(built.corrections.len(), 1);
    }

    #[test]
    fn non_positive_source_is_rejected_before_running() {
        let err = Engine::new(
            SimConfig::new(0.1, 1.0).unwrap(),
            characteristic(),
            GridModel::stiff(),
            TargetPolicy::Offset,
            Timing::new(300.0, 10.0),
            Profile::constant(0.0),
            Profile::ramp(0.0, 1.0, 10.0, 0.0),
            ControllerState { v_ref: 1.0, q: 0.0 },
        )
        .err();
        assert_eq!(err, Some(SimError::SourceVoltage(0.0)));
    }

    #[test]
    fn empty_source_signal_is_rejected_before_running() {
        let err = Engine::new(
            SimConfig::new(0.1, 1.0).unwrap(),
            characteristic(),
            GridModel::new(0.05, 0.1),
            TargetPolicy::Offset,
            Timing::new(300.0, 10.0),
            Profile::constant(0.0),
            Profile::new(Vec::new()),
            ControllerState { v_ref: 1.0, q: 0.0 },
        )
        .err();
        assert_eq!(err, Some(SimError::EmptySignal { field: "v_src_pu" }));
    }

    #[test]
    fn empty_power_signal_is_rejected_before_running() {
        let err = Engine::new(
            SimConfig::new(0.1, 1.0).unwrap(),
            characteristic(),
            GridModel::stiff(),
            TargetPolicy::Offset,
            Timing::new(300.0, 10.0),
            Profile::new(Vec::new()),
            Profile::constant(1.0),
            ControllerState { v_ref: 1.0, q: 0.0 },
        )
        .err();
        assert_eq!(err, Some(SimError::EmptySignal { field: "p_pu" }));
    }
}
