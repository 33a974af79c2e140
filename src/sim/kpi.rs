//! Post-hoc run summary computed from simulation results.

use std::fmt;

use serde::Serialize;

use super::types::StepResult;

/// Aggregate indicators derived from a complete simulation run.
///
/// Computed post-hoc from `Vec<StepResult>` so the reported values always
/// match the step data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// Largest reactive-power magnitude over the run (pu).
    pub peak_abs_q_pu: f64,
    /// Signed reactive power at the peak (pu).
    pub q_at_peak_pu: f64,
    /// Time of the peak (s).
    pub peak_time_s: f64,
    /// Reactive power in the last record (pu).
    pub final_q_pu: f64,
    /// Largest `|Vpoc - Vref|` over the run (pu).
    pub max_abs_v_err_pu: f64,
    /// Reference voltage in the last record (pu).
    pub final_v_ref_pu: f64,
    /// POC voltage in the last record (pu).
    pub final_v_poc_pu: f64,
    /// Reactive power at `t = Tref`, when AARV is enabled and the run reaches it (pu).
    pub q_at_t_ref_pu: Option<f64>,
    /// `q_at_t_ref_pu` as a percentage of Q1.
    pub q_at_t_ref_pct_of_q1: Option<f64>,
}

impl RunSummary {
    /// Computes the summary from the complete step record vector.
    ///
    /// # Arguments
    ///
    /// * `results` - Complete simulation step results
    /// * `q1` - Capacitive limit of the characteristic (pu)
    /// * `t_ref_s` - Validated AARV time constant; `0` means disabled
    /// * `dt_s` - Step size used to locate the record at `t_ref_s`
    pub fn from_results(results: &[StepResult], q1: f64, t_ref_s: f64, dt_s: f64) -> Self {
        let Some(last) = results.last() else {
            return Self {
                peak_abs_q_pu: 0.0,
                q_at_peak_pu: 0.0,
                peak_time_s: 0.0,
                final_q_pu: 0.0,
                max_abs_v_err_pu: 0.0,
                final_v_ref_pu: 0.0,
                final_v_poc_pu: 0.0,
                q_at_t_ref_pu: None,
                q_at_t_ref_pct_of_q1: None,
            };
        };

        let mut peak = &results[0];
        let mut max_abs_v_err = 0.0_f64;
        for r in results {
            if r.q_pu.abs() > peak.q_pu.abs() {
                peak = r;
            }
            max_abs_v_err = max_abs_v_err.max(r.v_err_pu.abs());
        }

        let q_at_t_ref = (t_ref_s > 0.0)
            .then(|| {
                results
                    .iter()
                    .find(|r| (r.time_s - t_ref_s).abs() <= dt_s / 2.0)
                    .map(|r| r.q_pu)
            })
            .flatten();
        let q_at_t_ref_pct = q_at_t_ref
            .filter(|_| q1 != 0.0)
            .map(|q| 100.0 * q / q1);

        Self {
            peak_abs_q_pu: peak.q_pu.abs(),
            q_at_peak_pu: peak.q_pu,
            peak_time_s: peak.time_s,
            final_q_pu: last.q_pu,
            max_abs_v_err_pu: max_abs_v_err,
            final_v_ref_pu: last.v_ref_pu,
            final_v_poc_pu: last.v_poc_pu,
            q_at_t_ref_pu: q_at_t_ref,
            q_at_t_ref_pct_of_q1: q_at_t_ref_pct,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Run Summary ---")?;
        writeln!(
            f,
            "Peak Q:                {:.4} pu (signed {:.4} at {:.1} s)",
            self.peak_abs_q_pu, self.q_at_peak_pu, self.peak_time_s
        )?;
        writeln!(f, "Final Q:               {:.4} pu", self.final_q_pu)?;
        writeln!(f, "Max |Verr|:            {:.4} pu", self.max_abs_v_err_pu)?;
        writeln!(f, "Final Vref:            {:.4} pu", self.final_v_ref_pu)?;
        write!(f, "Final Vpoc:            {:.4} pu", self.final_v_poc_pu)?;
        match (self.q_at_t_ref_pu, self.q_at_t_ref_pct_of_q1) {
            (Some(q), Some(pct)) => write!(
                f,
                "\nQ(Tref):               {q:.4} pu ({pct:.2}% of Q1)"
            ),
            (Some(q), None) => write!(f, "\nQ(Tref):               {q:.4} pu"),
            _ => Ok(()),
        }
    }
}

/// Pass/fail threshold for the residual reactive power one `Tref` after a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConformanceCheck {
    /// Largest allowed `|Q(Tref)|` as a percentage of Q1.
    pub max_pct_of_q1: f64,
}

impl ConformanceCheck {
    /// `None` when the run has no `Q(Tref)` sample to judge.
    pub fn passes(&self, summary: &RunSummary) -> Option<bool> {
        summary
            .q_at_t_ref_pct_of_q1
            .map(|pct| pct.abs() <= self.max_pct_of_q1)
    }
}
