//! Simulation clock management.
//!
//! Time is derived from the number of accepted macro steps
//! (`step_count × dt`) rather than accumulated by repeated addition, so
//! sample times never drift and stay exactly reproducible.

use serde::{Deserialize, Serialize};

/// Fixed-step simulation clock.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimClock {
    /// Macro step in seconds.
    dt: f64,
    /// Number of accepted steps since the last reset.
    step_count: u64,
}

impl SimClock {
    /// Create a new clock with the given timestep in seconds.
    ///
    /// # Panics
    ///
    /// Panics if timestep is not positive or not finite. Configuration
    /// validation rejects such values before a clock is built.
    #[must_use]
    pub fn new(dt: f64) -> Self {
        assert!(dt > 0.0, "Timestep must be positive");
        assert!(dt.is_finite(), "Timestep must be finite");
        Self { dt, step_count: 0 }
    }

    /// Current simulation time in seconds.
    #[must_use]
    pub fn now(&self) -> f64 {
        self.time_at(self.step_count)
    }

    /// Time after one more tick, without ticking.
    #[must_use]
    pub fn peek_next(&self) -> f64 {
        self.time_at(self.step_count + 1)
    }

    /// Time of the `n`-th step.
    #[must_use]
    pub fn time_at(&self, n: u64) -> f64 {
        n as f64 * self.dt
    }

    /// Macro step in seconds.
    #[must_use]
    pub const fn dt(&self) -> f64 {
        self.dt
    }

    /// Number of accepted steps.
    #[must_use]
    pub const fn step_count(&self) -> u64 {
        self.step_count
    }

    /// Advance by one step and return the new time.
    pub fn tick(&mut self) -> f64 {
        self.step_count += 1;
        self.now()
    }

    /// Reset clock to zero.
    #[allow(clippy::missing_const_for_fn)]
    pub fn reset(&mut self) {
        self.step_count = 0;
    }
}
