//! Fatal precondition errors.
//!
//! Out-of-range parameters that can be pulled back to a standard boundary are
//! not errors; they surface as [`Correction`](crate::control::limits::Correction)
//! values instead. Everything here means the request cannot be computed.

use thiserror::Error;

/// A request that cannot be computed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// An input was NaN or infinite.
    #[error("{field} must be finite, got {value}")]
    NonFinite { field: &'static str, value: f64 },

    /// The volt-var slope must be strictly positive.
    #[error("volt-var slope must be > 0, got {0}")]
    NonPositiveSlope(f64),

    /// The constructed breakpoint voltages are not non-decreasing.
    #[error("breakpoint voltages are not non-decreasing: {0:?}")]
    NonMonotoneBreakpoints([f64; 6]),

    /// A driving signal has no corners to evaluate.
    #[error("{field} signal has no points")]
    EmptySignal { field: &'static str },

    /// Source voltage must be strictly positive for the voltage-drop model.
    #[error("source voltage must be > 0 pu, got {0}")]
    SourceVoltage(f64),

    /// Simulation time step must be strictly positive.
    #[error("time step must be > 0 s, got {0}")]
    InvalidTimeStep(f64),

    /// Horizon shorter than one time step.
    #[error("horizon of {horizon_s} s is shorter than one step of {dt_s} s")]
    EmptyHorizon { horizon_s: f64, dt_s: f64 },
}

/// Returns `value` unchanged, or [`SimError::NonFinite`] naming `field`.
pub(crate) fn finite(field: &'static str, value: f64) -> Result<f64, SimError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(SimError::NonFinite { field, value })
    }
}
