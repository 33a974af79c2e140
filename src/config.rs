//! TOML-based scenario configuration and preset definitions.

use std::fmt;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::control::{DerCategory, Timing, VoltVarParams};
use crate::grid::GridModel;
use crate::sim::kpi::ConformanceCheck;
use crate::sim::types::TargetPolicy;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the `step` preset. Load from TOML with
/// [`ScenarioConfig::from_toml_file`] or use [`ScenarioConfig::from_preset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Scenario shape, policy and timing.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Volt-var characteristic settings.
    #[serde(default)]
    pub volt_var: VoltVarConfig,
    /// Reference adaptation and open-loop timing.
    #[serde(default)]
    pub aarv: AarvConfig,
    /// Branch impedance between source and DER.
    #[serde(default)]
    pub grid: GridConfig,
    /// Step-test shape.
    #[serde(default)]
    pub step: StepConfig,
    /// Ramped power-on shape.
    #[serde(default)]
    pub power_ramp: PowerRampConfig,
    /// Source-voltage trapezoid shape.
    #[serde(default)]
    pub vsrc_fluctuation: VsrcFluctuationConfig,
    /// Optional pass/fail threshold on `Q(Tref)`.
    #[serde(default)]
    pub conformance: ConformanceConfig,
}

/// Scenario shape driving the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioKind {
    /// Source voltage stepped to a fixed target at `t = 0`.
    #[default]
    Step,
    /// Active power ramped from one level to another.
    PowerRamp,
    /// Source voltage following a trapezoid.
    VsrcFluctuation,
}

impl fmt::Display for ScenarioKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => write!(f, "step"),
            Self::PowerRamp => write!(f, "power_ramp"),
            Self::VsrcFluctuation => write!(f, "vsrc_fluctuation"),
        }
    }
}

/// Scenario shape, policy and timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    pub scenario: ScenarioKind,
    pub policy: TargetPolicy,
    /// Step size (s, must be > 0).
    pub dt_s: f64,
    /// Horizon in multiples of `aarv.t_ref_s` (must be > 0).
    pub periods: f64,
    /// Horizon used instead of `periods` when AARV is disabled (s).
    pub duration_s: f64,
}

impl SimulationConfig {
    /// `periods * Tref`, or `duration_s` when `timing` disables AARV.
    pub fn horizon_s(&self, timing: &Timing) -> f64 {
        if timing.aarv_enabled() {
            self.periods * timing.t_ref_s
        } else {
            self.duration_s
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            scenario: ScenarioKind::Step,
            policy: TargetPolicy::Offset,
            dt_s: 0.1,
            periods: 1.0,
            duration_s: 600.0,
        }
    }
}

/// Volt-var characteristic settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VoltVarConfig {
    /// Centre voltage (pu).
    pub v_ref: f64,
    /// Total deadband width (pu).
    pub deadband: f64,
    /// Gain (pu Q per pu V).
    pub slope: f64,
    /// Capacitive limit (pu).
    pub q_max: f64,
    /// Inductive limit (pu).
    pub q_min: f64,
    /// Reactive power inside the deadband (pu).
    pub q_bias: f64,
    pub category: DerCategory,
}

impl Default for VoltVarConfig {
    fn default() -> Self {
        Self {
            v_ref: 1.0,
            deadband: 0.0,
            slope: 2.5,
            q_max: 0.25,
            q_min: -0.25,
            q_bias: 0.0,
            category: DerCategory::B,
        }
    }
}

impl VoltVarConfig {
    pub fn params(&self) -> VoltVarParams {
        VoltVarParams {
            v_ref: self.v_ref,
            deadband: self.deadband,
            slope: self.slope,
            q_max: self.q_max,
            q_min: self.q_min,
            q_bias: self.q_bias,
            category: self.category,
        }
    }
}

/// Reference adaptation and open-loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AarvConfig {
    /// Reference time constant (s); `0` disables AARV.
    pub t_ref_s: f64,
    /// Open-loop response time (s); `0` removes the lag.
    pub t_response_s: f64,
    /// Initial reference voltage (pu). Scenario-dependent default when absent.
    pub v_init: Option<f64>,
}

impl Default for AarvConfig {
    fn default() -> Self {
        Self {
            t_ref_s: 300.0,
            t_response_s: 10.0,
            v_init: None,
        }
    }
}

impl AarvConfig {
    pub fn timing(&self) -> Timing {
        Timing::new(self.t_ref_s, self.t_response_s)
    }
}

/// Branch impedance between source and DER, in ohms on a kV / MVA base.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GridConfig {
    /// Line-to-line base voltage (kV).
    pub base_kv: f64,
    /// Three-phase base power (MVA).
    pub base_mva: f64,
    /// Series resistance (ohm).
    pub r_ohm: f64,
    /// Series reactance (ohm).
    pub x_ohm: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            base_kv: 13.2,
            base_mva: 6.0,
            r_ohm: 0.0,
            x_ohm: 0.0,
        }
    }
}

impl GridConfig {
    /// Per-unit model on this base.
    pub fn model(&self) -> GridModel {
        GridModel::from_ohms(self.base_kv, self.base_mva, self.r_ohm, self.x_ohm)
    }
}

/// Step-test shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StepConfig {
    /// Source voltage from `t = 0` (pu). Defaults to midway between V1 and V2.
    pub v_target_pu: Option<f64>,
    /// Constant active-power injection (pu).
    pub p_pu: f64,
}

/// Ramped power-on shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PowerRampConfig {
    /// Active power at `t = 0` (pu).
    pub p_start_pu: f64,
    /// Active power after the ramp (pu).
    pub p_end_pu: f64,
    /// Ramp duration (s).
    pub ramp_s: f64,
    /// Constant source voltage (pu).
    pub v_src_pu: f64,
}

impl Default for PowerRampConfig {
    fn default() -> Self {
        Self {
            p_start_pu: 0.0,
            p_end_pu: 1.0,
            ramp_s: 60.0,
            v_src_pu: 1.0,
        }
    }
}

/// Source-voltage trapezoid shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VsrcFluctuationConfig {
    /// Constant active-power injection (pu).
    pub p_pu: f64,
    /// Source voltage outside the trapezoid (pu).
    pub v_base_pu: f64,
    /// Source voltage on the plateau (pu).
    pub v_peak_pu: f64,
    pub rise_start_s: f64,
    pub rise_end_s: f64,
    pub fall_start_s: f64,
    pub fall_end_s: f64,
    /// Fixed-point iterations used to settle Q before the run when AARV is disabled.
    pub presettle_iterations: usize,
}

impl Default for VsrcFluctuationConfig {
    fn default() -> Self {
        Self {
            p_pu: 0.5,
            v_base_pu: 1.0,
            v_peak_pu: 1.03,
            rise_start_s: 300.0,
            rise_end_s: 600.0,
            fall_start_s: 1200.0,
            fall_end_s: 1500.0,
            presettle_iterations: 20,
        }
    }
}

impl VsrcFluctuationConfig {
    pub fn corners(&self) -> [f64; 4] {
        [
            self.rise_start_s,
            self.rise_end_s,
            self.fall_start_s,
            self.fall_end_s,
        ]
    }
}

/// Optional pass/fail threshold on `Q(Tref)`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConformanceConfig {
    /// Largest allowed `|Q(Tref)|` in percent of Q1.
    pub max_pct_of_q1: Option<f64>,
}

impl ConformanceConfig {
    pub fn check(&self) -> Option<ConformanceCheck> {
        self.max_pct_of_q1
            .map(|max_pct_of_q1| ConformanceCheck { max_pct_of_q1 })
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"simulation.dt_s"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Feeder used by the grid-feedback presets: 1.210 + j2.8339 ohm on 13.2 kV / 6 MVA.
fn feeder_grid() -> GridConfig {
    GridConfig {
        r_ohm: 1.210,
        x_ohm: 2.8339,
        ..GridConfig::default()
    }
}

impl ScenarioConfig {
    /// Step to midway between V1 and V2 on a stiff grid, zero deadband.
    pub fn step() -> Self {
        Self::default()
    }

    /// Step test on a characteristic with a 0.04 pu deadband and steeper slope.
    pub fn step_deadband() -> Self {
        Self {
            volt_var: VoltVarConfig {
                deadband: 0.04,
                slope: 22.0 / 3.0,
                q_max: 0.44,
                q_min: -0.44,
                ..VoltVarConfig::default()
            },
            aarv: AarvConfig {
                t_response_s: 5.0,
                ..AarvConfig::default()
            },
            conformance: ConformanceConfig {
                max_pct_of_q1: Some(10.0),
            },
            ..Self::default()
        }
    }

    /// Unity export ramped on over a minute behind a feeder impedance.
    pub fn power_ramp() -> Self {
        Self {
            simulation: SimulationConfig {
                scenario: ScenarioKind::PowerRamp,
                periods: 3.0,
                ..SimulationConfig::default()
            },
            grid: feeder_grid(),
            ..Self::default()
        }
    }

    /// Source voltage swell and recovery at half export behind a feeder impedance.
    pub fn vsrc_fluctuation() -> Self {
        Self {
            simulation: SimulationConfig {
                scenario: ScenarioKind::VsrcFluctuation,
                periods: 6.0,
                ..SimulationConfig::default()
            },
            grid: feeder_grid(),
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["step", "step_deadband", "power_ramp", "vsrc_fluctuation"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "step" => Ok(Self::step()),
            "step_deadband" => Ok(Self::step_deadband()),
            "power_ramp" => Ok(Self::power_ramp()),
            "vsrc_fluctuation" => Ok(Self::vsrc_fluctuation()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Simulated duration after the timing constants are clamped.
    pub fn horizon_s(&self) -> f64 {
        self.simulation.horizon_s(&self.aarv.timing().clamped())
    }

    /// Validates structural constraints and returns a list of errors.
    ///
    /// Standard-range violations of the volt-var and timing settings are not
    /// reported here; they are clamped when the run is prepared.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();
        let mut positive = |field: &str, value: f64| {
            if value <= 0.0 || value.is_nan() {
                errors.push(ConfigError::new(field, "must be > 0"));
            }
        };

        let s = &self.simulation;
        positive("simulation.dt_s", s.dt_s);
        positive("simulation.periods", s.periods);
        positive("simulation.duration_s", s.duration_s);
        positive("volt_var.slope", self.volt_var.slope);

        let g = &self.grid;
        positive("grid.base_kv", g.base_kv);
        positive("grid.base_mva", g.base_mva);

        match s.scenario {
            ScenarioKind::Step => {
                if let Some(v) = self.step.v_target_pu {
                    positive("step.v_target_pu", v);
                }
            }
            ScenarioKind::PowerRamp => positive("power_ramp.v_src_pu", self.power_ramp.v_src_pu),
            ScenarioKind::VsrcFluctuation => {
                positive("vsrc_fluctuation.v_base_pu", self.vsrc_fluctuation.v_base_pu);
                positive("vsrc_fluctuation.v_peak_pu", self.vsrc_fluctuation.v_peak_pu);
            }
        }

        if g.r_ohm < 0.0 {
            errors.push(ConfigError::new("grid.r_ohm", "must be >= 0"));
        }
        if g.x_ohm < 0.0 {
            errors.push(ConfigError::new("grid.x_ohm", "must be >= 0"));
        }
        if self.power_ramp.ramp_s < 0.0 {
            errors.push(ConfigError::new("power_ramp.ramp_s", "must be >= 0"));
        }
        if self.vsrc_fluctuation.corners().windows(2).any(|w| w[0] > w[1]) {
            errors.push(ConfigError::new(
                "vsrc_fluctuation.rise_start_s",
                "corners must be ordered rise_start <= rise_end <= fall_start <= fall_end",
            ));
        }
        if self.conformance.max_pct_of_q1.is_some_and(|p| p < 0.0) {
            errors.push(ConfigError::new("conformance.max_pct_of_q1", "must be >= 0"));
        }
        if s.dt_s > 0.0 && self.horizon_s() < s.dt_s {
            errors.push(ConfigError::new(
                "simulation.periods",
                "horizon must cover at least one step",
            ));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_preset_valid() {
        let cfg = ScenarioConfig::step();
        let errors = cfg.validate();
        assert!(errors.is_empty(), "step should be valid: {errors:?}");
    }

    #[test]
    fn from_preset_step() {
        let cfg = ScenarioConfig::from_preset("step");
        assert!(cfg.is_ok());
    }

    #[test]
    fn from_preset_unknown() {
        let err = ScenarioConfig::from_preset("nonexistent");
        assert!(err.is_err());
        let e = err.unwrap_err();
        assert!(e.message.contains("unknown preset"));
    }

    #[test]
    fn valid_toml_parses() {
        let toml = r#"
[simulation]
scenario = "vsrc_fluctuation"
policy = "table_shift"
dt_s = 0.5
periods = 4

[volt_var]
v_ref = 1.0
deadband = 0.02
slope = 5.0
q_max = 0.44
q_min = -0.44
category = "B"

[aarv]
t_ref_s = 600
t_response_s = 5
v_init = 1.01

[grid]
base_kv = 12.47
base_mva = 10
r_ohm = 0.8
x_ohm = 2.0

[vsrc_fluctuation]
p_pu = 0.8
v_peak_pu = 1.04
presettle_iterations = 50

[conformance]
max_pct_of_q1 = 10
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok(), "valid TOML should parse: {:?}", cfg.err());
        let cfg = cfg.unwrap();
        assert_eq!(cfg.simulation.scenario, ScenarioKind::VsrcFluctuation);
        assert_eq!(cfg.simulation.policy, TargetPolicy::TableShift);
        assert_eq!(cfg.aarv.v_init, Some(1.01));
        assert_eq!(cfg.vsrc_fluctuation.presettle_iterations, 50);
        assert_eq!(cfg.vsrc_fluctuation.rise_start_s, 300.0);
        assert_eq!(cfg.horizon_s(), 2400.0);
        assert_eq!(cfg.conformance.check().map(|c| c.max_pct_of_q1), Some(10.0));
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn invalid_toml_unknown_field() {
        let toml = r#"
[aarv]
t_ref_s = 300
bogus_field = true
"#;
        let result = ScenarioConfig::from_toml_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_scenario_kind_is_rejected() {
        let toml = r#"
[simulation]
scenario = "frequency_droop"
"#;
        assert!(ScenarioConfig::from_toml_str(toml).is_err());
    }

    #[test]
    fn validation_catches_zero_dt() {
        let mut cfg = ScenarioConfig::step();
        cfg.simulation.dt_s = 0.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "simulation.dt_s"));
    }

    #[test]
    fn validation_catches_negative_impedance() {
        let mut cfg = ScenarioConfig::power_ramp();
        cfg.grid.x_ohm = -1.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "grid.x_ohm"));
    }

    #[test]
    fn validation_catches_unordered_corners() {
        let mut cfg = ScenarioConfig::vsrc_fluctuation();
        cfg.vsrc_fluctuation.fall_start_s = 100.0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "vsrc_fluctuation.rise_start_s"));
    }

    #[test]
    fn validation_catches_non_positive_source() {
        let mut cfg = ScenarioConfig::step();
        cfg.step.v_target_pu = Some(0.0);
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "step.v_target_pu"));
    }

    #[test]
    fn out_of_range_standard_settings_are_not_config_errors() {
        let mut cfg = ScenarioConfig::step();
        cfg.volt_var.v_ref = 1.2;
        cfg.aarv.t_ref_s = 100.0;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn all_presets_are_valid() {
        for name in ScenarioConfig::PRESETS {
            let cfg = ScenarioConfig::from_preset(name);
            assert!(cfg.is_ok(), "preset \"{name}\" should load");
            let errors = cfg.as_ref().map(|c| c.validate()).unwrap_or_default();
            assert!(
                errors.is_empty(),
                "preset \"{name}\" should be valid: {errors:?}"
            );
        }
    }

    #[test]
    fn disabled_aarv_uses_fixed_duration() {
        let mut cfg = ScenarioConfig::step();
        cfg.aarv.t_ref_s = 0.0;
        cfg.simulation.duration_s = 120.0;
        assert_eq!(cfg.horizon_s(), 120.0);
        assert_eq!(ScenarioConfig::power_ramp().horizon_s(), 900.0);
    }

    #[test]
    fn horizon_uses_clamped_t_ref() {
        let mut cfg = ScenarioConfig::step();
        cfg.aarv.t_ref_s = 6000.0;
        assert_eq!(cfg.horizon_s(), 5000.0);
        cfg.aarv.t_ref_s = 100.0;
        assert_eq!(cfg.horizon_s(), 300.0);
    }

    #[test]
    fn horizon_check_sees_clamped_t_ref() {
        let mut cfg = ScenarioConfig::step();
        cfg.simulation.dt_s = 200.0;
        cfg.aarv.t_ref_s = 100.0;
        assert!(cfg.validate().is_empty());
    }

    #[test]
    fn feeder_presets_share_impedance() {
        let ramp = ScenarioConfig::power_ramp().grid.model();
        let fluct = ScenarioConfig::vsrc_fluctuation().grid.model();
        assert_eq!(ramp, fluct);
        assert!(ramp.x_pu > ramp.r_pu);
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let toml = r#"
[volt_var]
deadband = 0.02
"#;
        let cfg = ScenarioConfig::from_toml_str(toml);
        assert!(cfg.is_ok());
        let cfg = cfg.ok();
        // deadband overridden
        assert_eq!(cfg.as_ref().map(|c| c.volt_var.deadband), Some(0.02));
        // slope kept default
        assert_eq!(cfg.as_ref().map(|c| c.volt_var.slope), Some(2.5));
        // timing kept default
        assert_eq!(cfg.as_ref().map(|c| c.aarv.t_ref_s), Some(300.0));
    }
}
