//! Grid-side model feeding the measured voltage back into the controller.

pub mod voltage_drop;

pub use voltage_drop::{GridModel, PoiVoltage, z_base_ohm};
