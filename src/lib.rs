//! IEEE 1547 volt-var simulator with autonomously adjusting reference voltage (AARV).

/// REST API over a finished run.
#[cfg(feature = "api")]
pub mod api;
/// TOML scenario configuration and presets.
pub mod config;
/// Volt-var characteristic and standard parameter ranges.
pub mod control;
pub mod error;
/// Source-to-DER voltage-drop model.
pub mod grid;
pub mod io;
/// Scenario assembly and complete runs.
pub mod scenario;
/// Control loop, clock, signals, and run summary.
pub mod sim;
