//! Equations of motion for two gravity-coupled rotators.
//!
//! ```text
//! dθ1/dt = ω1
//! dω1/dt = -g·sin(θ1) - J·sin(θ1 - θ2)
//! dθ2/dt = ω2
//! dω2/dt = -g·sin(θ2) - J·sin(θ2 - θ1)
//! ```
//!
//! These follow from the Lagrangian
//! `L = ½(ω1² + ω2²) + g(cos θ1 + cos θ2) + J cos(θ1 - θ2)`.

use crate::engine::state::{PhysicalParams, STATE_DIM};

/// System of ordinary differential equations: dy/dt = f(t, y).
pub trait OdeSystem<const N: usize> {
    /// Evaluate the right-hand side of the ODE system.
    ///
    /// # Arguments
    /// * `t` - Current time
    /// * `y` - Current state vector
    /// * `dydt` - Output: derivative dy/dt
    fn rhs(&self, t: f64, y: &[f64; N], dydt: &mut [f64; N]);
}

/// The coupled-rotator vector field. Autonomous; `t` is ignored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoupledRotators {
    params: PhysicalParams,
}

impl CoupledRotators {
    /// Create the system for the given parameters.
    #[must_use]
    pub const fn new(params: PhysicalParams) -> Self {
        Self { params }
    }

    /// Parameters this system was built with.
    #[must_use]
    pub const fn params(&self) -> PhysicalParams {
        self.params
    }

    /// Convenience wrapper returning the derivative by value.
    #[must_use]
    pub fn derivative(&self, y: &[f64; STATE_DIM]) -> [f64; STATE_DIM] {
        let mut dydt = [0.0; STATE_DIM];
        self.rhs(0.0, y, &mut dydt);
        dydt
    }
}

impl OdeSystem<STATE_DIM> for CoupledRotators {
    fn rhs(&self, _t: f64, y: &[f64; STATE_DIM], dydt: &mut [f64; STATE_DIM]) {
        let [t1, w1, t2, w2] = *y;
        let PhysicalParams { coupling, gravity } = self.params;
        let torsion = coupling * (t1 - t2).sin();

        dydt[0] = w1;
        dydt[1] = -gravity * t1.sin() - torsion;
        dydt[2] = w2;
        dydt[3] = -gravity * t2.sin() + torsion;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rest_is_equilibrium() {
        let sys = CoupledRotators::new(PhysicalParams::new(2.0, 9.81));
        assert_eq!(sys.derivative(&[0.0; 4]), [0.0; 4]);
    }

    #[test]
    fn test_velocities_pass_through() {
        let sys = CoupledRotators::new(PhysicalParams::new(0.0, 0.0));
        let d = sys.derivative(&[0.3, 1.5, -0.2, -2.5]);
        assert_eq!(d, [1.5, 0.0, -2.5, 0.0]);
    }

    #[test]
    fn test_gravity_only() {
        let sys = CoupledRotators::new(PhysicalParams::new(0.0, 9.81));
        let d = sys.derivative(&[PI / 2.0, 0.0, -PI / 2.0, 0.0]);
        assert!((d[1] + 9.81).abs() < 1e-12);
        assert!((d[3] - 9.81).abs() < 1e-12);
    }

    #[test]
    fn test_coupling_is_antisymmetric() {
        let sys = CoupledRotators::new(PhysicalParams::new(3.0, 0.0));
        let d = sys.derivative(&[0.4, 0.0, -0.1, 0.0]);
        // Internal torque: equal and opposite.
        assert!((d[1] + d[3]).abs() < 1e-12);
        assert!((d[1] + 3.0 * 0.5_f64.sin()).abs() < 1e-12);
    }

    #[test]
    fn test_time_is_ignored() {
        let sys = CoupledRotators::new(PhysicalParams::default());
        let y = [1.0, 0.5, -0.7, 0.2];
        let mut a = [0.0; 4];
        let mut b = [0.0; 4];
        sys.rhs(0.0, &y, &mut a);
        sys.rhs(123.4, &y, &mut b);
        assert_eq!(a, b);
    }
}
