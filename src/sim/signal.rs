//! Piecewise-linear driving signals.

use serde::Serialize;

use crate::error::{SimError, finite};

/// A time series defined by `(time_s, value)` corners with linear
/// interpolation in between and constant extension beyond both ends.
///
/// # Examples
///
/// ```
/// use aarv_sim::sim::signal::Profile;
///
/// let p = Profile::ramp(0.0, 0.0, 10.0, 1.0);
/// assert_eq!(p.at(-1.0), 0.0);
/// assert_eq!(p.at(5.0), 0.5);
/// assert_eq!(p.at(20.0), 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    points: Vec<(f64, f64)>,
}

impl Profile {
    /// Builds a profile from corners, ordering them by time.
    ///
    /// Corners sharing a time are kept in the given order, which makes an
    /// instantaneous step.
    pub fn new(mut points: Vec<(f64, f64)>) -> Self {
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        Self { points }
    }

    /// A signal fixed at `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![(0.0, value)])
    }

    /// Holds `v0` until `t0`, moves linearly to `v1` at `t1`, then holds.
    pub fn ramp(t0: f64, v0: f64, t1: f64, v1: f64) -> Self {
        Self::new(vec![(t0, v0), (t1, v1)])
    }

    /// `base` outside `[corners[0], corners[3]]`, `peak` on `[corners[1], corners[2]]`,
    /// linear on both edges.
    pub fn trapezoid(base: f64, peak: f64, corners: [f64; 4]) -> Self {
        let [rise_start, rise_end, fall_start, fall_end] = corners;
        Self::new(vec![
            (rise_start, base),
            (rise_end, peak),
            (fall_start, peak),
            (fall_end, base),
        ])
    }

    /// Value at time `t`.
    pub fn at(&self, t: f64) -> f64 {
        let Some(&(t_first, v_first)) = self.points.first() else {
            return 0.0;
        };
        if t <= t_first {
            return v_first;
        }
        let Some(&(t_last, v_last)) = self.points.last() else {
            return v_first;
        };
        if t >= t_last {
            return v_last;
        }

        self.points
            .windows(2)
            .find(|w| t >= w[0].0 && t < w[1].0)
            .map_or(v_last, |w| {
                let ((t0, v0), (t1, v1)) = (w[0], w[1]);
                v0 + (v1 - v0) * (t - t0) / (t1 - t0)
            })
    }

    /// Smallest corner value, `None` for an empty profile. Linear segments
    /// never go below it.
    pub fn min_value(&self) -> Option<f64> {
        self.points.iter().map(|&(_, v)| v).reduce(f64::min)
    }

    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Fails if the profile is empty or any corner time or value is NaN or infinite.
    pub fn check_finite(&self, field: &'static str) -> Result<(), SimError> {
        if self.points.is_empty() {
            return Err(SimError::EmptySignal { field });
        }
        for &(t, v) in &self.points {
            finite(field, t)?;
            finite(field, v)?;
        }
        Ok(())
    }
}
