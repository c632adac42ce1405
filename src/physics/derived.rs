//! Quantities derived from each accepted state: energy decomposition and
//! continuous (unwrapped) angles.
//!
//! Both are computed once, when a sample enters the history store, and are
//! never recomputed at read time.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

use crate::engine::state::{PhysicalParams, RotorState};

/// Energy per unit mass·length², split by rotator.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyBreakdown {
    /// `½ω1² + g(1 − cos θ1)`.
    pub rotor1: f64,
    /// `½ω2² + g(1 − cos θ2)`.
    pub rotor2: f64,
    /// `rotor1 + rotor2 + J(1 − cos(θ1 − θ2))`.
    pub total: f64,
}

impl EnergyBreakdown {
    /// Closed-form energies for a state. Zero for the resting state.
    #[must_use]
    pub fn of(state: &RotorState, params: &PhysicalParams) -> Self {
        let rotor1 = 0.5 * state.omega1 * state.omega1 + params.gravity * (1.0 - state.theta1.cos());
        let rotor2 = 0.5 * state.omega2 * state.omega2 + params.gravity * (1.0 - state.theta2.cos());
        let coupling = params.coupling * (1.0 - (state.theta1 - state.theta2).cos());
        Self {
            rotor1,
            rotor2,
            total: rotor1 + rotor2 + coupling,
        }
    }

    /// Energy stored in the coupling spring alone.
    #[must_use]
    pub fn coupling(&self) -> f64 {
        self.total - self.rotor1 - self.rotor2
    }

    /// As an `(e1, e2, etotal)` tuple.
    #[must_use]
    pub const fn as_tuple(&self) -> (f64, f64, f64) {
        (self.rotor1, self.rotor2, self.total)
    }
}

/// Wrap an angle into `[-π, π)` via `((x + π) mod 2π) − π`.
#[must_use]
pub fn wrap_angle(x: f64) -> f64 {
    (x + PI).rem_euclid(TAU) - PI
}

/// Running accumulator that turns wrapped angle samples into a continuous
/// trajectory, independently per rotator.
///
/// Each update adds the minimal wrapped increment since the previous
/// sample, so consecutive outputs never differ by more than `π`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AngleUnwrapper {
    last: (f64, f64),
    unwrapped: (f64, f64),
}

impl AngleUnwrapper {
    /// Start a new trajectory at the given angles.
    #[must_use]
    pub const fn seeded(theta1: f64, theta2: f64) -> Self {
        Self {
            last: (theta1, theta2),
            unwrapped: (theta1, theta2),
        }
    }

    /// Restart at the given angles, discarding the accumulated turns.
    pub fn seed(&mut self, theta1: f64, theta2: f64) {
        *self = Self::seeded(theta1, theta2);
    }

    /// Feed a new sample and return the updated unwrapped pair.
    pub fn update(&mut self, theta1: f64, theta2: f64) -> (f64, f64) {
        self.unwrapped.0 += wrap_angle(theta1 - self.last.0);
        self.unwrapped.1 += wrap_angle(theta2 - self.last.1);
        self.last = (theta1, theta2);
        self.unwrapped
    }

    /// Current unwrapped pair.
    #[must_use]
    pub const fn unwrapped(&self) -> (f64, f64) {
        self.unwrapped
    }

    /// Last raw sample seen.
    #[must_use]
    pub const fn last(&self) -> (f64, f64) {
        self.last
    }
}
