//! Rotator state and physical parameters.
//!
//! The state vector is `(theta1, omega1, theta2, omega2)`. Angles are
//! stored exactly as the integrator produces them; wrapping is handled by
//! the history store when derived quantities are computed.

use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Dimension of the coupled-rotator state vector.
pub const STATE_DIM: usize = 4;

/// Horizontal offset of each pivot from the origin (rendering convention).
pub const PIVOT_OFFSET: f64 = 1.0;

/// Angular state of both rotators.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RotorState {
    /// Angle of rotator 1 (rad, 0 = hanging down).
    pub theta1: f64,
    /// Angular velocity of rotator 1 (rad/s).
    pub omega1: f64,
    /// Angle of rotator 2 (rad).
    pub theta2: f64,
    /// Angular velocity of rotator 2 (rad/s).
    pub omega2: f64,
}

impl RotorState {
    /// Create a new state.
    #[must_use]
    pub const fn new(theta1: f64, omega1: f64, theta2: f64, omega2: f64) -> Self {
        Self {
            theta1,
            omega1,
            theta2,
            omega2,
        }
    }

    /// Pack into the solver's flat layout.
    #[must_use]
    pub const fn to_array(self) -> [f64; STATE_DIM] {
        [self.theta1, self.omega1, self.theta2, self.omega2]
    }

    /// Unpack from the solver's flat layout.
    #[must_use]
    pub const fn from_array(y: [f64; STATE_DIM]) -> Self {
        Self::new(y[0], y[1], y[2], y[3])
    }

    /// Both angles as a pair.
    #[must_use]
    pub const fn thetas(&self) -> (f64, f64) {
        (self.theta1, self.theta2)
    }

    /// Check if all components are finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }

    /// Named components in solver order.
    #[must_use]
    pub const fn components(&self) -> [(&'static str, f64); STATE_DIM] {
        [
            ("theta1", self.theta1),
            ("omega1", self.omega1),
            ("theta2", self.theta2),
            ("omega2", self.omega2),
        ]
    }

    /// First non-finite component, if any.
    #[must_use]
    pub fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        self.components().into_iter().find(|(_, v)| !v.is_finite())
    }

    /// Bob positions for drawing, with pivots at `(-1, 0)` and `(1, 0)`.
    ///
    /// Angle zero points straight down.
    #[must_use]
    pub fn bob_positions(&self, arm_length: f64) -> [(f64, f64); 2] {
        [
            (
                -PIVOT_OFFSET + arm_length * self.theta1.sin(),
                -arm_length * self.theta1.cos(),
            ),
            (
                PIVOT_OFFSET + arm_length * self.theta2.sin(),
                -arm_length * self.theta2.cos(),
            ),
        ]
    }
}

impl From<[f64; STATE_DIM]> for RotorState {
    fn from(y: [f64; STATE_DIM]) -> Self {
        Self::from_array(y)
    }
}

/// Physical parameters, fixed between resets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalParams {
    /// Coupling strength `J` (N·m).
    pub coupling: f64,
    /// Gravitational acceleration `g` (m/s²).
    pub gravity: f64,
}

impl PhysicalParams {
    /// Create parameters.
    #[must_use]
    pub const fn new(coupling: f64, gravity: f64) -> Self {
        Self { coupling, gravity }
    }

    /// Reject non-finite parameters. Negative values pass; range clamping
    /// is the caller's job.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidInput` naming the first bad parameter.
    pub fn ensure_finite(&self) -> SimResult<()> {
        for (field, value) in [("coupling", self.coupling), ("gravity", self.gravity)] {
            if !value.is_finite() {
                return Err(SimError::InvalidInput { field, value });
            }
        }
        Ok(())
    }
}

impl Default for PhysicalParams {
    fn default() -> Self {
        Self::new(2.0, 9.81)
    }
}
