//! Standard-mandated parameter ranges, clamping with correction reports, and
//! decrement-factor precomputation for the two first-order filters.

use std::f64::consts::LN_10;
use std::fmt;

use log::warn;
use serde::Serialize;

use crate::error::{SimError, finite};

/// Lower bound of the volt-var reference voltage (pu).
pub const V_REF_MIN: f64 = 0.95;
/// Upper bound of the volt-var reference voltage (pu).
pub const V_REF_MAX: f64 = 1.05;
/// Largest deadband allowed for category B equipment (pu).
pub const DEADBAND_MAX_CAT_B: f64 = 0.06;
/// Reference-adaptation time constant range when AARV is enabled (s).
pub const T_REF_RANGE_S: (f64, f64) = (300.0, 5000.0);
/// Open-loop response time range (s).
pub const T_RESPONSE_RANGE_S: (f64, f64) = (1.0, 90.0);

/// A parameter that was pulled back to the nearest valid boundary.
///
/// Corrections are informational: the run continues with `applied`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Correction {
    /// Dotted parameter name, e.g. `"volt_var.v_ref"`.
    pub field: &'static str,
    /// Value the caller asked for.
    pub requested: f64,
    /// Value actually used.
    pub applied: f64,
}

impl fmt::Display for Correction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} corrected from {} to {}",
            self.field, self.requested, self.applied
        )
    }
}

/// A value together with the corrections applied while producing it.
#[derive(Debug, Clone)]
pub struct Corrected<T> {
    pub value: T,
    pub corrections: Vec<Correction>,
}

/// Clamps `value` into `[lo, hi]`, recording a [`Correction`] when it moves.
pub fn clamp_reported(
    field: &'static str,
    value: f64,
    lo: f64,
    hi: f64,
    corrections: &mut Vec<Correction>,
) -> f64 {
    let applied = value.clamp(lo, hi);
    if applied != value {
        let correction = Correction {
            field,
            requested: value,
            applied,
        };
        warn!("{correction}");
        corrections.push(correction);
    }
    applied
}

/// AARV and open-loop timing parameters.
///
/// `t_ref_s == 0` disables reference adaptation; `t_response_s == 0` means the
/// output follows its target with no lag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Timing {
    /// Reference-voltage adaptation time constant (s).
    pub t_ref_s: f64,
    /// Open-loop settling time to 90 % (s).
    pub t_response_s: f64,
}

impl Timing {
    pub fn new(t_ref_s: f64, t_response_s: f64) -> Self {
        Self {
            t_ref_s,
            t_response_s,
        }
    }

    /// Returns `true` when the reference voltage adapts.
    pub fn aarv_enabled(&self) -> bool {
        self.t_ref_s > 0.0
    }

    /// Clamps both constants into their ranges, keeping the zero special cases.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NonFinite`] for NaN or infinite inputs.
    pub fn validated(&self) -> Result<Corrected<Self>, SimError> {
        let t_ref_s = finite("aarv.t_ref_s", self.t_ref_s)?;
        let t_response_s = finite("aarv.t_response_s", self.t_response_s)?;
        let mut corrections = Vec::new();

        let (lo, hi) = timing_bounds(t_ref_s, T_REF_RANGE_S);
        let t_ref_s = clamp_reported("aarv.t_ref_s", t_ref_s, lo, hi, &mut corrections);
        let (lo, hi) = timing_bounds(t_response_s, T_RESPONSE_RANGE_S);
        let t_response_s =
            clamp_reported("aarv.t_response_s", t_response_s, lo, hi, &mut corrections);

        Ok(Corrected {
            value: Self {
                t_ref_s,
                t_response_s,
            },
            corrections,
        })
    }

    /// The values [`Timing::validated`] would apply, without reporting.
    pub fn clamped(&self) -> Self {
        let clamp = |v: f64, range| {
            let (lo, hi) = timing_bounds(v, range);
            v.clamp(lo, hi)
        };
        Self {
            t_ref_s: clamp(self.t_ref_s, T_REF_RANGE_S),
            t_response_s: clamp(self.t_response_s, T_RESPONSE_RANGE_S),
        }
    }
}

/// Non-positive time constants collapse to zero; the rest stay in `range`.
fn timing_bounds(value: f64, range: (f64, f64)) -> (f64, f64) {
    if value <= 0.0 { (0.0, 0.0) } else { range }
}

/// Per-step filter gains derived once from the time constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecrementFactors {
    /// Reference adaptation gain, `1 - e^(-dt/Tref)`; zero when AARV is off.
    pub inc_ref: f64,
    /// Open-loop gain, `1 - e^(-dt/tau)` with `tau = Tresponse / ln 10`.
    pub inc_ol: f64,
}

impl DecrementFactors {
    pub fn new(dt_s: f64, timing: &Timing) -> Self {
        Self {
            inc_ref: reference_increment(dt_s, timing.t_ref_s),
            inc_ol: open_loop_increment(dt_s, timing.t_response_s),
        }
    }
}

/// Gain of the slow reference filter. Zero disables adaptation.
pub fn reference_increment(dt_s: f64, t_ref_s: f64) -> f64 {
    if t_ref_s <= 0.0 {
        0.0
    } else {
        1.0 - (-dt_s / t_ref_s).exp()
    }
}

/// Gain of the fast open-loop filter. A zero response time tracks instantly.
pub fn open_loop_increment(dt_s: f64, t_response_s: f64) -> f64 {
    if t_response_s <= 0.0 {
        1.0
    } else {
        let tau = t_response_s / LN_10;
        1.0 - (-dt_s / tau).exp()
    }
}
