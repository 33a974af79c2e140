//! Piecewise-linear volt-var characteristic.
//!
//! The table always has six points: a low sentinel, the four standard
//! breakpoints V1..V4, and a high sentinel. The sentinels repeat Q1 and Q4 so
//! that a plain interpolation routine extrapolates as a constant.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::limits::{Corrected, DEADBAND_MAX_CAT_B, V_REF_MAX, V_REF_MIN, clamp_reported};
use crate::error::{SimError, finite};

/// Distance of each sentinel from its neighbouring breakpoint (pu).
pub const EXTRAPOLATION_MARGIN_PU: f64 = 0.01;

/// Names of the six table points, in voltage order.
pub const BREAKPOINT_LABELS: [&str; 6] = ["VL", "V1", "V2", "V3", "V4", "VH"];

/// IEEE 1547 normal-operating-performance category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DerCategory {
    /// No deadband permitted.
    A,
    /// Deadband up to 0.06 pu.
    #[default]
    B,
}

/// System-level volt-var settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoltVarParams {
    /// Centre voltage (pu).
    pub v_ref: f64,
    /// Total deadband width around `v_ref` (pu).
    pub deadband: f64,
    /// Reactive-power gain (pu Q per pu V).
    pub slope: f64,
    /// Capacitive limit, Q1 (pu).
    pub q_max: f64,
    /// Inductive limit, Q4 (pu).
    pub q_min: f64,
    /// Reactive power inside the deadband, Q2 = Q3 (pu).
    pub q_bias: f64,
    pub category: DerCategory,
}

impl VoltVarParams {
    /// Clamps every recoverable parameter to its standard range.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NonFinite`] for NaN or infinite inputs and
    /// [`SimError::NonPositiveSlope`] when `slope <= 0`.
    pub fn validated(&self) -> Result<Corrected<Self>, SimError> {
        let v_ref = finite("volt_var.v_ref", self.v_ref)?;
        let deadband = finite("volt_var.deadband", self.deadband)?;
        let slope = finite("volt_var.slope", self.slope)?;
        let q_max = finite("volt_var.q_max", self.q_max)?;
        let q_min = finite("volt_var.q_min", self.q_min)?;
        let q_bias = finite("volt_var.q_bias", self.q_bias)?;
        if slope <= 0.0 {
            return Err(SimError::NonPositiveSlope(slope));
        }

        let mut corrections = Vec::new();
        let c = &mut corrections;
        let v_ref = clamp_reported("volt_var.v_ref", v_ref, V_REF_MIN, V_REF_MAX, c);
        let db_max = match self.category {
            DerCategory::A => 0.0,
            DerCategory::B => DEADBAND_MAX_CAT_B,
        };
        let deadband = clamp_reported("volt_var.deadband", deadband, 0.0, db_max, c);
        let q_max = clamp_reported("volt_var.q_max", q_max, 0.0, f64::INFINITY, c);
        let q_min = clamp_reported("volt_var.q_min", q_min, f64::NEG_INFINITY, 0.0, c);
        let q_bias = clamp_reported("volt_var.q_bias", q_bias, q_min, q_max, c);

        Ok(Corrected {
            value: Self {
                v_ref,
                deadband,
                slope,
                q_max,
                q_min,
                q_bias,
                category: self.category,
            },
            corrections,
        })
    }
}

/// Ordered breakpoint table `[VL, V1, V2, V3, V4, VH] x [Q1, Q1, Q2, Q3, Q4, Q4]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Characteristic {
    params: VoltVarParams,
    v: [f64; 6],
    q: [f64; 6],
}

impl Characteristic {
    /// Validates `params` and builds the breakpoint table.
    ///
    /// Out-of-range inputs are clamped and returned as corrections.
    ///
    /// # Errors
    ///
    /// Fails on non-finite inputs, a non-positive slope, or a table whose
    /// voltages are not non-decreasing.
    pub fn build(params: &VoltVarParams) -> Result<Corrected<Self>, SimError> {
        let Corrected {
            value: params,
            corrections,
        } = params.validated()?;
        let (v, q) = breakpoints(&params);
        if v.windows(2).any(|w| w[0] > w[1]) {
            return Err(SimError::NonMonotoneBreakpoints(v));
        }
        Ok(Corrected {
            value: Self { params, v, q },
            corrections,
        })
    }

    /// Rebuilds the table from the same settings around a new centre voltage.
    ///
    /// `v_ref` is used as given; callers keep it inside the reference range.
    pub fn recentered(&self, v_ref: f64) -> Self {
        let params = VoltVarParams {
            v_ref,
            ..self.params
        };
        let (v, q) = breakpoints(&params);
        Self { params, v, q }
    }

    /// Interpolated reactive power at voltage `v`.
    ///
    /// Returns exactly Q1 below V1 and exactly Q4 above V4.
    pub fn lookup(&self, v: f64) -> f64 {
        let (first, last) = (self.v[0], self.v[5]);
        if v <= first {
            return self.q[0];
        }
        if v >= last {
            return self.q[5];
        }
        self.v
            .windows(2)
            .zip(self.q.windows(2))
            .find(|(vs, _)| v >= vs[0] && v < vs[1])
            .map_or(self.q[5], |(vs, qs)| {
                let ratio = (v - vs[0]) / (vs[1] - vs[0]);
                qs[0] + (qs[1] - qs[0]) * ratio
            })
    }

    /// Validated settings the table was built from.
    pub fn params(&self) -> &VoltVarParams {
        &self.params
    }

    /// Centre voltage of this table.
    pub fn center(&self) -> f64 {
        self.params.v_ref
    }

    /// Breakpoint voltages, sentinels included.
    pub fn voltages(&self) -> [f64; 6] {
        self.v
    }

    /// Breakpoint reactive powers, sentinels included.
    pub fn reactive(&self) -> [f64; 6] {
        self.q
    }

    pub fn v1(&self) -> f64 {
        self.v[1]
    }

    pub fn v2(&self) -> f64 {
        self.v[2]
    }

    pub fn v3(&self) -> f64 {
        self.v[3]
    }

    pub fn v4(&self) -> f64 {
        self.v[4]
    }

    pub fn q1(&self) -> f64 {
        self.q[1]
    }

    pub fn q4(&self) -> f64 {
        self.q[4]
    }
}

fn breakpoints(p: &VoltVarParams) -> ([f64; 6], [f64; 6]) {
    let (q1, q4) = (p.q_max, p.q_min);
    let (q2, q3) = (p.q_bias, p.q_bias);
    let v2 = p.v_ref - p.deadband / 2.0;
    let v3 = p.v_ref + p.deadband / 2.0;
    let v1 = v2 - (q1 - q2) / p.slope;
    let v4 = v3 - (q4 - q3) / p.slope;
    (
        [
            v1 - EXTRAPOLATION_MARGIN_PU,
            v1,
            v2,
            v3,
            v4,
            v4 + EXTRAPOLATION_MARGIN_PU,
        ],
        [q1, q1, q2, q3, q4, q4],
    )
}

impl fmt::Display for Characteristic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "point   V (pu)    Q (pu)")?;
        for (i, label) in BREAKPOINT_LABELS.iter().enumerate() {
            write!(f, "{label:<5} {:>8.4}  {:>8.4}", self.v[i], self.q[i])?;
            if i < BREAKPOINT_LABELS.len() - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}
