//! CSV export for simulation step results.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::sim::types::StepResult;

/// Column header for CSV telemetry export.
const HEADER: &str = "step,time_s,p_pu,q_pu,vsrc_pu,vpoc_pu,vref_pu,verr_pu,qtarg_pu";

/// Exports simulation results to a CSV file at the given path.
///
/// Writes a header row followed by one data row per step. Produces
/// deterministic output for identical inputs.
///
/// # Arguments
///
/// * `results` - Complete simulation step results
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(results: &[StepResult], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(results, buf)
}

/// Writes simulation results as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(results: &[StepResult], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(','))?;

    for r in results {
        wtr.write_record(&[
            r.step.to_string(),
            format!("{:.3}", r.time_s),
            format!("{:.6}", r.p_pu),
            format!("{:.6}", r.q_pu),
            format!("{:.6}", r.v_src_pu),
            format!("{:.6}", r.v_poc_pu),
            format!("{:.6}", r.v_ref_pu),
            format!("{:.6}", r.v_err_pu),
            format!("{:.6}", r.q_target_pu),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}
