//! Adaptive time integration.
//!
//! The engine advances by a fixed macro step `DT`; inside that interval the
//! [`DormandPrince`] solver picks its own substeps to keep the local error
//! below `atol + rtol·|y|`. `DT` is a reporting granularity, never the
//! internal step size.
//!
//! Dormand-Prince 5(4) is a 7-stage embedded pair with the FSAL property:
//! the last stage of an accepted step is the first stage of the next one.
//!
//! ```text
//! y_{n+1} = y_n + h Σ b_i k_i            (5th order, propagated)
//! err     = h Σ (b_i - b̂_i) k_i           (4th order estimate)
//! h_new   = h · clamp(0.9 · ‖err‖^(-1/5), 0.2, 10)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::dynamics::OdeSystem;
use crate::config::SolverConfig;
use crate::engine::state::STATE_DIM;

const STAGES: usize = 7;

const C: [f64; STAGES] = [0.0, 1.0 / 5.0, 3.0 / 10.0, 4.0 / 5.0, 8.0 / 9.0, 1.0, 1.0];

const A: [[f64; STAGES - 1]; STAGES] = [
    [0.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [1.0 / 5.0, 0.0, 0.0, 0.0, 0.0, 0.0],
    [3.0 / 40.0, 9.0 / 40.0, 0.0, 0.0, 0.0, 0.0],
    [44.0 / 45.0, -56.0 / 15.0, 32.0 / 9.0, 0.0, 0.0, 0.0],
    [
        19372.0 / 6561.0,
        -25360.0 / 2187.0,
        64448.0 / 6561.0,
        -212.0 / 729.0,
        0.0,
        0.0,
    ],
    [
        9017.0 / 3168.0,
        -355.0 / 33.0,
        46732.0 / 5247.0,
        49.0 / 176.0,
        -5103.0 / 18656.0,
        0.0,
    ],
    [
        35.0 / 384.0,
        0.0,
        500.0 / 1113.0,
        125.0 / 192.0,
        -2187.0 / 6784.0,
        11.0 / 84.0,
    ],
];

const B: [f64; STAGES] = [
    35.0 / 384.0,
    0.0,
    500.0 / 1113.0,
    125.0 / 192.0,
    -2187.0 / 6784.0,
    11.0 / 84.0,
    0.0,
];

/// `b - b̂`: weights of the embedded error estimate.
const E: [f64; STAGES] = [
    -71.0 / 57600.0,
    0.0,
    71.0 / 16695.0,
    -71.0 / 1920.0,
    17253.0 / 339_200.0,
    -22.0 / 525.0,
    1.0 / 40.0,
];

/// Order of the embedded error estimator.
const ERROR_ORDER: f64 = 4.0;

/// Errors that can occur during integration.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum IntegrationError {
    /// Step size shrank below the representable minimum.
    #[error("step size {h:.3e} too small at t = {t}")]
    StepSizeTooSmall {
        /// Time at which step size became too small.
        t: f64,
        /// Step size that was too small.
        h: f64,
    },
    /// The substep budget for one macro step ran out.
    #[error("exceeded {budget} internal substeps")]
    MaxSubstepsExceeded {
        /// Configured budget.
        budget: u32,
    },
    /// A stage or accepted step produced NaN/Inf.
    #[error("non-finite state at t = {t}")]
    NonFiniteState {
        /// Time of the offending step.
        t: f64,
    },
    /// Invalid input parameters.
    #[error("invalid solver input: {message}")]
    InvalidInput {
        /// Description of the invalid input.
        message: String,
    },
}

/// Integration statistics for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolverStats {
    /// Total number of right-hand-side evaluations.
    pub fn_evals: u64,
    /// Number of accepted internal substeps.
    pub accepted_steps: u64,
    /// Number of rejected internal substeps.
    pub rejected_steps: u64,
}

/// Advances the coupled-rotator state across one macro interval.
///
/// The engine owns a boxed `Stepper`, so tests can inject a stand-in that
/// fails on demand.
pub trait Stepper: Send {
    /// Integrate `y0` from `t0` to `t1`.
    ///
    /// # Errors
    ///
    /// Returns `IntegrationError` if the tolerance cannot be met within
    /// the internal budget. The caller's state must be left untouched.
    fn advance(
        &mut self,
        system: &dyn OdeSystem<STATE_DIM>,
        t0: f64,
        y0: &[f64; STATE_DIM],
        t1: f64,
    ) -> Result<[f64; STATE_DIM], IntegrationError>;

    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Cumulative statistics since the last reset.
    fn stats(&self) -> SolverStats {
        SolverStats::default()
    }

    /// Forget any step-size memory and statistics.
    fn reset(&mut self) {}
}

/// Dormand-Prince 5(4) adaptive integrator.
#[derive(Debug, Clone)]
pub struct DormandPrince<const N: usize> {
    /// Relative tolerance.
    rtol: f64,
    /// Absolute tolerance.
    atol: f64,
    /// Substep budget per `integrate` call.
    max_substeps: u32,
    /// Safety factor applied to the optimal step.
    safety: f64,
    /// Smallest shrink factor per substep.
    min_factor: f64,
    /// Largest growth factor per substep.
    max_factor: f64,
    /// Step size carried between calls.
    h_last: Option<f64>,
    /// Integration statistics.
    stats: SolverStats,
}

impl<const N: usize> DormandPrince<N> {
    /// Create a solver with explicit tolerances and substep budget.
    #[must_use]
    pub const fn new(rtol: f64, atol: f64, max_substeps: u32) -> Self {
        Self {
            rtol,
            atol,
            max_substeps,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
            h_last: None,
            stats: SolverStats {
                fn_evals: 0,
                accepted_steps: 0,
                rejected_steps: 0,
            },
        }
    }

    /// Create a solver from configuration.
    #[must_use]
    pub const fn from_config(config: &SolverConfig) -> Self {
        Self::new(config.rtol, config.atol, config.max_substeps)
    }

    /// Current statistics.
    #[must_use]
    pub const fn solver_stats(&self) -> SolverStats {
        self.stats
    }

    /// Integrate from `t0` to `tf`, returning the state at `tf`.
    ///
    /// # Errors
    ///
    /// - `InvalidInput` for non-finite inputs or `tf <= t0`
    /// - `NonFiniteState` if a substep produces NaN/Inf
    /// - `StepSizeTooSmall` / `MaxSubstepsExceeded` if the tolerance
    ///   cannot be met
    pub fn integrate<S: OdeSystem<N> + ?Sized>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        tf: f64,
    ) -> Result<[f64; N], IntegrationError> {
        Self::validate_inputs(t0, y0, tf)?;

        let mut t = t0;
        let mut y = *y0;
        let mut f = [0.0; N];
        sys.rhs(t, &y, &mut f);
        self.stats.fn_evals += 1;

        let span = tf - t0;
        let mut h = match self.h_last {
            Some(h) => h.min(span),
            None => self.initial_step(sys, t0, &y, &f, span),
        };

        let mut substeps = 0u32;
        let mut k = [[0.0; N]; STAGES];

        while t < tf {
            if substeps >= self.max_substeps {
                return Err(IntegrationError::MaxSubstepsExceeded {
                    budget: self.max_substeps,
                });
            }
            substeps += 1;

            let h_min = 10.0 * f64::EPSILON * t.abs().max(1.0);
            if h < h_min {
                return Err(IntegrationError::StepSizeTooSmall { t, h });
            }

            // Land exactly on tf.
            let last = t + h >= tf;
            let h_eff = if last { tf - t } else { h };

            k[0] = f;
            let y_new = self.compute_stages(sys, t, &y, h_eff, &mut k);
            if !y_new.iter().all(|v| v.is_finite()) {
                return Err(IntegrationError::NonFiniteState { t: t + h_eff });
            }

            let err = self.error_norm(&y, &y_new, &k, h_eff);
            if !err.is_finite() {
                return Err(IntegrationError::NonFiniteState { t: t + h_eff });
            }

            let factor = if err == 0.0 {
                self.max_factor
            } else {
                (self.safety * err.powf(-1.0 / (ERROR_ORDER + 1.0)))
                    .clamp(self.min_factor, self.max_factor)
            };

            if err <= 1.0 {
                self.stats.accepted_steps += 1;
                t = if last { tf } else { t + h_eff };
                y = y_new;
                f = k[STAGES - 1];
                // Don't let the truncated final substep shrink the carried step.
                if !last || factor > 1.0 {
                    h = h_eff * factor;
                }
            } else {
                self.stats.rejected_steps += 1;
                h = h_eff * factor.min(1.0);
            }
        }

        self.h_last = Some(h);
        Ok(y)
    }

    /// Fill stages 1..7 (stage 0 is supplied) and return the 5th order solution.
    #[allow(clippy::needless_range_loop)]
    fn compute_stages<S: OdeSystem<N> + ?Sized>(
        &mut self,
        sys: &S,
        t: f64,
        y: &[f64; N],
        h: f64,
        k: &mut [[f64; N]; STAGES],
    ) -> [f64; N] {
        let mut y_temp = [0.0; N];

        for i in 1..STAGES {
            for n in 0..N {
                let mut sum = 0.0;
                for j in 0..i {
                    sum += A[i][j] * k[j][n];
                }
                y_temp[n] = y[n] + h * sum;
            }
            let mut out = [0.0; N];
            sys.rhs(t + C[i] * h, &y_temp, &mut out);
            k[i] = out;
        }
        self.stats.fn_evals += (STAGES - 1) as u64;

        // The last stage is evaluated at the 5th order solution (FSAL).
        let mut y_new = [0.0; N];
        for n in 0..N {
            let mut sum = 0.0;
            for i in 0..STAGES {
                sum += B[i] * k[i][n];
            }
            y_new[n] = y[n] + h * sum;
        }
        y_new
    }

    /// RMS norm of the scaled error estimate.
    #[allow(clippy::needless_range_loop)]
    fn error_norm(&self, y: &[f64; N], y_new: &[f64; N], k: &[[f64; N]; STAGES], h: f64) -> f64 {
        let mut acc = 0.0;
        for n in 0..N {
            let mut err_n = 0.0;
            for i in 0..STAGES {
                err_n += E[i] * k[i][n];
            }
            let scale = self.atol + self.rtol * y[n].abs().max(y_new[n].abs());
            let scaled = h * err_n / scale;
            acc += scaled * scaled;
        }
        (acc / N as f64).sqrt()
    }

    /// Starting step guess (Hairer, Nørsett & Wanner, II.4).
    #[allow(clippy::needless_range_loop)]
    fn initial_step<S: OdeSystem<N> + ?Sized>(
        &mut self,
        sys: &S,
        t0: f64,
        y0: &[f64; N],
        f0: &[f64; N],
        span: f64,
    ) -> f64 {
        let mut scale = [0.0; N];
        for i in 0..N {
            scale[i] = self.atol + y0[i].abs() * self.rtol;
        }

        let d0 = scaled_rms(y0, &scale);
        let d1 = scaled_rms(f0, &scale);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        }
        .min(span);

        let mut y1 = [0.0; N];
        for i in 0..N {
            y1[i] = y0[i] + h0 * f0[i];
        }
        let mut f1 = [0.0; N];
        sys.rhs(t0 + h0, &y1, &mut f1);
        self.stats.fn_evals += 1;

        let mut df = [0.0; N];
        for i in 0..N {
            df[i] = f1[i] - f0[i];
        }
        let d2 = scaled_rms(&df, &scale) / h0;
        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(1.0 / (ERROR_ORDER + 1.0))
        };

        (100.0 * h0).min(h1).min(span)
    }

    fn validate_inputs(t0: f64, y0: &[f64; N], tf: f64) -> Result<(), IntegrationError> {
        if !t0.is_finite() || !tf.is_finite() {
            return Err(IntegrationError::InvalidInput {
                message: "t0 and tf must be finite".to_string(),
            });
        }
        if tf <= t0 {
            return Err(IntegrationError::InvalidInput {
                message: format!("tf ({tf}) must be greater than t0 ({t0})"),
            });
        }
        for (i, &val) in y0.iter().enumerate() {
            if !val.is_finite() {
                return Err(IntegrationError::InvalidInput {
                    message: format!("y0[{i}] is not finite"),
                });
            }
        }
        Ok(())
    }
}

fn scaled_rms<const N: usize>(v: &[f64; N], scale: &[f64; N]) -> f64 {
    let sum: f64 = v.iter().zip(scale).map(|(x, s)| (x / s).powi(2)).sum();
    (sum / N as f64).sqrt()
}

impl Default for DormandPrince<STATE_DIM> {
    fn default() -> Self {
        Self::from_config(&SolverConfig::default())
    }
}

impl Stepper for DormandPrince<STATE_DIM> {
    fn advance(
        &mut self,
        system: &dyn OdeSystem<STATE_DIM>,
        t0: f64,
        y0: &[f64; STATE_DIM],
        t1: f64,
    ) -> Result<[f64; STATE_DIM], IntegrationError> {
        self.integrate(system, t0, y0, t1)
    }

    fn name(&self) -> &'static str {
        "dopri5"
    }

    fn stats(&self) -> SolverStats {
        self.stats
    }

    fn reset(&mut self) {
        self.h_last = None;
        self.stats = SolverStats::default();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    struct HarmonicOscillator {
        omega: f64,
    }

    impl OdeSystem<2> for HarmonicOscillator {
        fn rhs(&self, _t: f64, y: &[f64; 2], dydt: &mut [f64; 2]) {
            dydt[0] = y[1];
            dydt[1] = -self.omega * self.omega * y[0];
        }
    }

    struct Exponential;

    impl OdeSystem<1> for Exponential {
        fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
            dydt[0] = y[0];
        }
    }

    struct Blowup;

    impl OdeSystem<1> for Blowup {
        fn rhs(&self, _t: f64, y: &[f64; 1], dydt: &mut [f64; 1]) {
            dydt[0] = y[0] * y[0];
        }
    }

    #[test]
    fn test_tableau_consistency() {
        // Row sums of A equal C.
        for i in 0..STAGES {
            let sum: f64 = A[i].iter().sum();
            assert!((sum - C[i]).abs() < 1e-14, "row {i}");
        }
        let b_sum: f64 = B.iter().sum();
        assert!((b_sum - 1.0).abs() < 1e-14);
        let e_sum: f64 = E.iter().sum();
        assert!(e_sum.abs() < 1e-14);
    }

    #[test]
    fn test_exponential_growth() {
        let mut solver = DormandPrince::<1>::new(1e-10, 1e-12, 10_000);
        let y = solver.integrate(&Exponential, 0.0, &[1.0], 1.0).unwrap();
        assert!((y[0] - std::f64::consts::E).abs() < 1e-8);
    }

    #[test]
    fn test_harmonic_oscillator_full_period() {
        let sys = HarmonicOscillator { omega: 1.0 };
        let mut solver = DormandPrince::<2>::new(1e-9, 1e-12, 100_000);
        let y = solver
            .integrate(&sys, 0.0, &[1.0, 0.0], 2.0 * std::f64::consts::PI)
            .unwrap();
        assert!((y[0] - 1.0).abs() < 1e-6);
        assert!(y[1].abs() < 1e-6);
    }

    #[test]
    fn test_chained_macro_steps_match_single_span() {
        let sys = HarmonicOscillator { omega: 2.0 };
        let mut chained = DormandPrince::<2>::new(1e-9, 1e-12, 10_000);
        let mut y = [1.0, 0.0];
        for i in 0..50 {
            let t0 = f64::from(i) * 0.02;
            y = chained.integrate(&sys, t0, &y, t0 + 0.02).unwrap();
        }
        let exact = [(2.0_f64).cos(), -2.0 * (2.0_f64).sin()];
        assert!((y[0] - exact[0]).abs() < 1e-6);
        assert!((y[1] - exact[1]).abs() < 1e-6);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut solver = DormandPrince::<1>::new(1e-7, 1e-6, 1000);
        solver.integrate(&Exponential, 0.0, &[1.0], 0.5).unwrap();
        let stats = solver.solver_stats();
        assert!(stats.accepted_steps >= 1);
        assert!(stats.fn_evals >= 7);
    }

    #[test]
    fn test_budget_exhaustion() {
        let mut solver = DormandPrince::<1>::new(1e-12, 1e-14, 2);
        let err = solver
            .integrate(&Exponential, 0.0, &[1.0], 100.0)
            .unwrap_err();
        assert_eq!(err, IntegrationError::MaxSubstepsExceeded { budget: 2 });
    }

    #[test]
    fn test_finite_time_blowup_fails() {
        // y' = y², y(0) = 1 diverges at t = 1.
        let mut solver = DormandPrince::<1>::new(1e-7, 1e-6, 100_000);
        let result = solver.integrate(&Blowup, 0.0, &[1.0], 2.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_backwards_interval() {
        let mut solver = DormandPrince::<1>::new(1e-7, 1e-6, 100);
        let err = solver.integrate(&Exponential, 1.0, &[1.0], 0.5).unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidInput { .. }));
    }

    #[test]
    fn test_rejects_non_finite_initial_state() {
        let mut solver = DormandPrince::<1>::new(1e-7, 1e-6, 100);
        let err = solver
            .integrate(&Exponential, 0.0, &[f64::NAN], 1.0)
            .unwrap_err();
        assert!(matches!(err, IntegrationError::InvalidInput { .. }));
    }

    #[test]
    fn test_stepper_reset_clears_stats() {
        let sys = crate::physics::dynamics::CoupledRotators::new(
            crate::engine::state::PhysicalParams::default(),
        );
        let mut solver = DormandPrince::<STATE_DIM>::default();
        solver.advance(&sys, 0.0, &[0.5, 0.0, 0.0, 0.0], 0.02).unwrap();
        assert!(Stepper::stats(&solver).fn_evals > 0);
        Stepper::reset(&mut solver);
        assert_eq!(Stepper::stats(&solver), SolverStats::default());
        assert_eq!(solver.name(), "dopri5");
    }
}
