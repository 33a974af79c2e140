//! Core simulation types: timing configuration, controller state, and step records.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SimError, finite};

/// Fixed-step timing for one run.
///
/// # Examples
///
/// ```
/// use aarv_sim::sim::types::SimConfig;
///
/// let cfg = SimConfig::new(0.1, 300.0).unwrap();
/// assert_eq!(cfg.total_steps(), 3001);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SimConfig {
    /// Step size (s).
    pub dt_s: f64,
    /// Simulated duration (s). The step at this time is included.
    pub horizon_s: f64,
}

impl SimConfig {
    /// Creates a timing configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidTimeStep`] if `dt_s` is not strictly
    /// positive and [`SimError::EmptyHorizon`] if the horizon is shorter than
    /// one step.
    pub fn new(dt_s: f64, horizon_s: f64) -> Result<Self, SimError> {
        let dt_s = finite("simulation.dt_s", dt_s)?;
        let horizon_s = finite("simulation.horizon_s", horizon_s)?;
        if dt_s <= 0.0 {
            return Err(SimError::InvalidTimeStep(dt_s));
        }
        if horizon_s < dt_s {
            return Err(SimError::EmptyHorizon { horizon_s, dt_s });
        }
        Ok(Self { dt_s, horizon_s })
    }

    /// Number of recorded steps, including `t = 0` and `t = horizon`.
    pub fn total_steps(&self) -> usize {
        (self.horizon_s / self.dt_s).round() as usize + 1
    }
}

/// How the target reactive power follows the adapted reference voltage.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum TargetPolicy {
    /// Keep the original table and shift the query voltage by the reference drift.
    #[default]
    Offset,
    /// Rebuild the table around the current reference every step.
    TableShift,
}

impl fmt::Display for TargetPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset => write!(f, "offset"),
            Self::TableShift => write!(f, "table_shift"),
        }
    }
}

/// Mutable controller state carried between steps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ControllerState {
    /// Adapted reference voltage (pu).
    pub v_ref: f64,
    /// Reactive-power output (pu).
    pub q: f64,
}

/// Complete record of one simulation step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepResult {
    /// Step index.
    pub step: usize,
    /// Simulation time (s).
    pub time_s: f64,
    /// Active-power injection (pu).
    pub p_pu: f64,
    /// Reactive-power output entering this step (pu).
    pub q_pu: f64,
    /// Source voltage (pu).
    pub v_src_pu: f64,
    /// Voltage at the point of connection (pu).
    pub v_poc_pu: f64,
    /// Reference voltage entering this step (pu).
    pub v_ref_pu: f64,
    /// `v_poc_pu - v_ref_pu`.
    pub v_err_pu: f64,
    /// Reactive power commanded by the characteristic (pu).
    pub q_target_pu: f64,
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "i={:>6} ({:>8.1}s) | P={:>7.4} Q={:>7.4} Qtarg={:>7.4} | \
             Vsrc={:.4} Vpoc={:.4} Vref={:.4} Verr={:>7.4}",
            self.step,
            self.time_s,
            self.p_pu,
            self.q_pu,
            self.q_target_pu,
            self.v_src_pu,
            self.v_poc_pu,
            self.v_ref_pu,
            self.v_err_pu,
        )
    }
}
