//! Volt-var control characteristic and the standard parameter ranges it is
//! validated against.

/// Breakpoint table construction and lookup.
pub mod characteristic;
/// Parameter ranges, correction reporting, and filter gains.
pub mod limits;

pub use characteristic::{Characteristic, DerCategory, VoltVarParams};
pub use limits::{Corrected, Correction, DecrementFactors, Timing};
