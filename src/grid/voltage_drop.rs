//! Single-branch voltage-drop model for the point of connection.

use serde::Serialize;

use crate::error::{SimError, finite};

/// Base impedance in ohms for a line-to-line base voltage and three-phase base power.
///
/// `Zbase = kV^2 / MVA`
pub fn z_base_ohm(base_kv: f64, base_mva: f64) -> f64 {
    base_kv * base_kv / base_mva
}

/// Per-unit series impedance between the source and the DER.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GridModel {
    /// Resistance (pu).
    pub r_pu: f64,
    /// Reactance (pu).
    pub x_pu: f64,
}

/// Voltage at the point of connection and its deviation from the source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PoiVoltage {
    /// POC voltage magnitude (pu).
    pub v_poc: f64,
    /// `v_poc - v_src` (pu).
    pub delta_v: f64,
}

impl GridModel {
    pub fn new(r_pu: f64, x_pu: f64) -> Self {
        Self { r_pu, x_pu }
    }

    /// Zero impedance: the POC voltage equals the source voltage.
    pub fn stiff() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Converts ohmic branch values to per unit on the given base.
    pub fn from_ohms(base_kv: f64, base_mva: f64, r_ohm: f64, x_ohm: f64) -> Self {
        let z_base = z_base_ohm(base_kv, base_mva);
        Self::new(r_ohm / z_base, x_ohm / z_base)
    }

    /// POC voltage for a power injection `dp`, `dq` behind this impedance.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::SourceVoltage`] when `v_src <= 0` and
    /// [`SimError::NonFinite`] for NaN or infinite inputs.
    pub fn poi_voltage(&self, dp: f64, dq: f64, v_src: f64) -> Result<PoiVoltage, SimError> {
        finite("grid.r_pu", self.r_pu)?;
        finite("grid.x_pu", self.x_pu)?;
        finite("p_pu", dp)?;
        finite("q_pu", dq)?;
        let v_src = finite("v_src_pu", v_src)?;
        if v_src <= 0.0 {
            return Err(SimError::SourceVoltage(v_src));
        }
        Ok(self.poi_voltage_unchecked(dp, dq, v_src))
    }

    /// Closed-form solution of the linearized branch equation.
    ///
    /// Callers guarantee `v_src > 0` and finite inputs.
    pub(crate) fn poi_voltage_unchecked(&self, dp: f64, dq: f64, v_src: f64) -> PoiVoltage {
        let (r, x) = (self.r_pu, self.x_pu);
        let v_sq = v_src * v_src;
        let a1 = v_sq + r * dp + x * dq;
        let a2 = x * dp - r * dq;
        let delta_v = a1.hypot(a2) / v_sq - 1.0;
        PoiVoltage {
            v_poc: v_src + delta_v,
            delta_v,
        }
    }
}

impl Default for GridModel {
    fn default() -> Self {
        Self::stiff()
    }
}
