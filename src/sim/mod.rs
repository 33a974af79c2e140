/// Simulation clock for timestep management.
pub mod clock;
pub mod engine;
/// Post-hoc run summary and conformance threshold.
pub mod kpi;
/// Piecewise-linear driving signals.
pub mod signal;
pub mod types;
