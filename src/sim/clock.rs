/// A fixed-step simulation clock.
///
/// Hands out step indices together with their simulation time, from `0`
/// up to and including the step at the horizon.
///
/// # Examples
///
/// ```
/// use aarv_sim::sim::clock::Clock;
///
/// let mut clock = Clock::new(3, 0.5);
/// let mut ticks = Vec::new();
///
/// clock.run(|step, t| ticks.push((step, t)));
/// assert_eq!(ticks, vec![(0, 0.0), (1, 0.5), (2, 1.0)]);
/// ```
pub struct Clock {
    /// Next step to hand out
    current: usize,
    /// Total steps to run
    total: usize,
    /// Step size in seconds
    dt_s: f64,
}

impl Clock {
    /// Creates a clock for `total` steps of `dt_s` seconds.
    pub fn new(total: usize, dt_s: f64) -> Self {
        Self {
            current: 0,
            total,
            dt_s,
        }
    }

    /// Simulation time of step `step`.
    ///
    /// Computed from the index rather than accumulated, so long runs do not
    /// drift.
    pub fn time_of(&self, step: usize) -> f64 {
        step as f64 * self.dt_s
    }

    /// Advances the clock by one step.
    ///
    /// # Returns
    ///
    /// * `Some(step)` - The step index before advancing
    /// * `None` - If the clock has handed out all steps
    pub fn tick(&mut self) -> Option<usize> {
        if self.current < self.total {
            let step = self.current;
            self.current += 1;
            Some(step)
        } else {
            None
        }
    }

    /// Calls `f(step, time_s)` for every remaining step.
    pub fn run(&mut self, mut f: impl FnMut(usize, f64)) {
        while let Some(step) = self.tick() {
            f(step, self.time_of(step));
        }
    }
}
