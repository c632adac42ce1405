//! Core simulation engine.
//!
//! Implements the macro-step loop:
//! - Adaptive integration across one `dt` (boxed [`Stepper`])
//! - Jidoka guard before a state is committed
//! - Derived-quantity ingestion into the bounded history window
//!
//! A step is atomic: either the new state, the clock tick and the history
//! record are all committed, or nothing changes.

pub mod clock;
pub mod jidoka;
pub mod shared;
pub mod state;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

pub use clock::SimClock;
pub use jidoka::{JidokaGuard, JidokaViolation, ViolationSeverity};
pub use shared::SharedEngine;
pub use state::{PhysicalParams, RotorState};

use crate::config::{InitialConditions, RotorConfig};
use crate::error::{SimError, SimResult};
use crate::history::{HistoryRecord, HistorySnapshot, HistoryStore};
use crate::physics::derived::EnergyBreakdown;
use crate::physics::dynamics::CoupledRotators;
use crate::physics::integrator::{DormandPrince, IntegrationError, SolverStats, Stepper};

/// Why a step left the engine unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The solver could not meet its tolerance.
    Integration(IntegrationError),
    /// The solver returned a state that failed the Jidoka check.
    Jidoka(JidokaViolation),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integration(e) => write!(f, "integration failed: {e}"),
            Self::Jidoka(v) => write!(f, "jidoka: {v}"),
        }
    }
}

impl From<RejectReason> for SimError {
    fn from(reason: RejectReason) -> Self {
        match reason {
            RejectReason::Integration(e) => Self::Integration(e),
            RejectReason::Jidoka(JidokaViolation::NonFiniteValue { location, .. }) => {
                Self::NonFiniteValue { location }
            }
        }
    }
}

/// Result of one macro step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StepOutcome {
    /// State advanced by `dt` and a history record was appended.
    Accepted {
        /// New simulation time.
        time: f64,
        /// New state.
        state: RotorState,
    },
    /// Nothing changed; `time` and `state` are the pre-step values.
    Rejected {
        /// Unchanged simulation time.
        time: f64,
        /// Unchanged state.
        state: RotorState,
        /// Cause of the rejection.
        reason: RejectReason,
    },
}

impl StepOutcome {
    /// Current time after the call.
    #[must_use]
    pub const fn time(&self) -> f64 {
        match self {
            Self::Accepted { time, .. } | Self::Rejected { time, .. } => *time,
        }
    }

    /// Current state after the call.
    #[must_use]
    pub const fn state(&self) -> &RotorState {
        match self {
            Self::Accepted { state, .. } | Self::Rejected { state, .. } => state,
        }
    }

    /// Whether the step advanced the simulation.
    #[must_use]
    pub const fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    /// `(time, state)` regardless of outcome.
    #[must_use]
    pub fn into_parts(self) -> (f64, RotorState) {
        match self {
            Self::Accepted { time, state } | Self::Rejected { time, state, .. } => (time, state),
        }
    }

    /// Convert a rejection into an error for callers that treat it as one.
    ///
    /// # Errors
    ///
    /// Returns the rejection reason as a `SimError`.
    pub fn into_result(self) -> SimResult<(f64, RotorState)> {
        match self {
            Self::Accepted { time, state } => Ok((time, state)),
            Self::Rejected { reason, .. } => Err(reason.into()),
        }
    }
}

/// Coupled-rotator simulation engine.
///
/// Owns the authoritative state, the clock, and the history window.
///
/// # Example
///
/// ```rust
/// use rotorsim::prelude::*;
///
/// let mut engine = RotorEngine::new(RotorConfig::default()).unwrap();
/// engine.reset(0.5, 0.0, -0.5, 0.0, 2.0, 9.81).unwrap();
///
/// let outcome = engine.step();
/// assert!(outcome.is_accepted());
/// assert_eq!(engine.history_snapshot().len(), 2);
/// ```
pub struct RotorEngine {
    config: RotorConfig,
    params: PhysicalParams,
    state: RotorState,
    clock: SimClock,
    history: HistoryStore,
    stepper: Box<dyn Stepper>,
    jidoka: JidokaGuard,
    rejected_steps: u64,
}

impl std::fmt::Debug for RotorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RotorEngine")
            .field("time", &self.clock.now())
            .field("state", &self.state)
            .field("params", &self.params)
            .field("stepper", &self.stepper.name())
            .field("history_len", &self.history.len())
            .finish_non_exhaustive()
    }
}

impl RotorEngine {
    /// Create an engine with the default Dormand-Prince solver, seeded
    /// with `config.initial`.
    ///
    /// # Errors
    ///
    /// Returns error if configuration validation fails or the initial
    /// conditions are not finite. No engine exists in that case.
    pub fn new(config: RotorConfig) -> SimResult<Self> {
        let stepper = Box::new(DormandPrince::from_config(&config.solver));
        Self::with_stepper(config, stepper)
    }

    /// Create an engine with a caller-supplied stepper.
    ///
    /// # Errors
    ///
    /// Same as [`RotorEngine::new`].
    pub fn with_stepper(config: RotorConfig, stepper: Box<dyn Stepper>) -> SimResult<Self> {
        config.check()?;

        let capacity = config.history_capacity()?;
        let initial = config.initial;
        let params = PhysicalParams::new(initial.coupling, initial.gravity);
        let mut engine = Self {
            clock: SimClock::new(config.dt),
            history: HistoryStore::new(capacity, params),
            jidoka: JidokaGuard::new(config.jidoka),
            params,
            state: RotorState::default(),
            stepper,
            rejected_steps: 0,
            config,
        };
        engine.reset_with(&initial)?;

        debug!(
            dt = engine.config.dt,
            window = engine.config.window_width,
            capacity = engine.history.capacity(),
            stepper = engine.stepper.name(),
            "rotor engine constructed"
        );
        Ok(engine)
    }

    /// Reinitialise state, parameters, clock and history.
    ///
    /// Angles are unrestricted. `coupling` and `gravity` are expected to be
    /// non-negative but this is not enforced.
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidInput` if any argument is not finite; the
    /// engine is left exactly as it was.
    pub fn reset(
        &mut self,
        theta1: f64,
        omega1: f64,
        theta2: f64,
        omega2: f64,
        coupling: f64,
        gravity: f64,
    ) -> SimResult<()> {
        self.reset_with(&InitialConditions {
            theta1,
            omega1,
            theta2,
            omega2,
            coupling,
            gravity,
        })
    }

    /// [`RotorEngine::reset`] taking an [`InitialConditions`].
    ///
    /// # Errors
    ///
    /// Returns `SimError::InvalidInput` if any field is not finite.
    pub fn reset_with(&mut self, initial: &InitialConditions) -> SimResult<()> {
        let state = RotorState::new(initial.theta1, initial.omega1, initial.theta2, initial.omega2);
        if let Some((field, value)) = state.first_non_finite() {
            return Err(SimError::InvalidInput { field, value });
        }
        let params = PhysicalParams::new(initial.coupling, initial.gravity);
        params.ensure_finite()?;

        self.state = state;
        self.params = params;
        self.clock.reset();
        self.stepper.reset();
        self.rejected_steps = 0;
        self.history.reset(0.0, &state, params);
        self.jidoka.arm(EnergyBreakdown::of(&state, &params).total);

        debug!(?state, coupling = params.coupling, gravity = params.gravity, "reset");
        Ok(())
    }

    /// Advance by one macro step `dt`.
    ///
    /// On success the new state is committed, the clock ticks and one
    /// history record is appended. On failure nothing changes and a
    /// warning is logged; the driver may simply call again next tick.
    pub fn step(&mut self) -> StepOutcome {
        let t0 = self.clock.now();
        let t1 = self.clock.peek_next();
        let system = CoupledRotators::new(self.params);

        let next = match self.stepper.advance(&system, t0, &self.state.to_array(), t1) {
            Ok(y) => RotorState::from_array(y),
            Err(e) => return self.reject(RejectReason::Integration(e)),
        };
        if let Err(v) = self.jidoka.check_state(&next) {
            return self.reject(RejectReason::Jidoka(v));
        }

        self.state = next;
        let time = self.clock.tick();
        let record = self.history.ingest(time, &next);
        self.jidoka.observe_energy(record.energy.total);

        trace!(time, ?next, energy = record.energy.total, "step accepted");
        StepOutcome::Accepted { time, state: next }
    }

    fn reject(&mut self, reason: RejectReason) -> StepOutcome {
        self.rejected_steps += 1;
        let time = self.clock.now();
        warn!(time, %reason, "integration step rejected; keeping previous state");
        StepOutcome::Rejected {
            time,
            state: self.state,
            reason,
        }
    }

    /// Call [`RotorEngine::step`] `n` times; returns how many were accepted.
    pub fn run_steps(&mut self, n: u64) -> u64 {
        (0..n).filter(|_| self.step().is_accepted()).count() as u64
    }

    /// Chronological copy of the history window.
    #[must_use]
    pub fn history_snapshot(&self) -> HistorySnapshot {
        self.history.snapshot()
    }

    /// Borrow the history store.
    #[must_use]
    pub const fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Most recent history record.
    #[must_use]
    pub fn latest_record(&self) -> Option<&HistoryRecord> {
        self.history.latest()
    }

    /// Current simulation time.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.clock.now()
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> &RotorState {
        &self.state
    }

    /// Current physical parameters.
    #[must_use]
    pub const fn params(&self) -> PhysicalParams {
        self.params
    }

    /// Engine configuration.
    #[must_use]
    pub const fn config(&self) -> &RotorConfig {
        &self.config
    }

    /// Relative total-energy drift since the last reset.
    #[must_use]
    pub const fn energy_drift(&self) -> f64 {
        self.jidoka.last_drift()
    }

    /// Accepted macro steps since the last reset.
    #[must_use]
    pub const fn accepted_steps(&self) -> u64 {
        self.clock.step_count()
    }

    /// Rejected macro steps since the last reset.
    #[must_use]
    pub const fn rejected_steps(&self) -> u64 {
        self.rejected_steps
    }

    /// Internal solver statistics since the last reset.
    #[must_use]
    pub fn solver_stats(&self) -> SolverStats {
        self.stepper.stats()
    }

    /// Bob positions for the current state using the configured arm length.
    #[must_use]
    pub fn bob_positions(&self) -> [(f64, f64); 2] {
        self.state.bob_positions(self.config.arm_length)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::config::SolverConfig;
    use crate::engine::state::STATE_DIM;
    use crate::physics::dynamics::OdeSystem;
    use std::f64::consts::PI;

    /// Stand-in that always fails to converge.
    struct FailingStepper;

    impl Stepper for FailingStepper {
        fn advance(
            &mut self,
            _system: &dyn OdeSystem<STATE_DIM>,
            _t0: f64,
            _y0: &[f64; STATE_DIM],
            _t1: f64,
        ) -> Result<[f64; STATE_DIM], IntegrationError> {
            Err(IntegrationError::MaxSubstepsExceeded { budget: 0 })
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    /// Stand-in that "succeeds" with garbage.
    struct NanStepper;

    impl Stepper for NanStepper {
        fn advance(
            &mut self,
            _system: &dyn OdeSystem<STATE_DIM>,
            _t0: f64,
            y0: &[f64; STATE_DIM],
            _t1: f64,
        ) -> Result<[f64; STATE_DIM], IntegrationError> {
            let mut y = *y0;
            y[3] = f64::NAN;
            Ok(y)
        }

        fn name(&self) -> &'static str {
            "nan"
        }
    }

    fn engine() -> RotorEngine {
        RotorEngine::new(RotorConfig::default()).unwrap()
    }

    #[test]
    fn test_new_engine_seeded_with_initial_sample() {
        let e = engine();
        assert_eq!(e.time(), 0.0);
        assert_eq!(e.history().capacity(), 252);
        let snap = e.history_snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.times[0], 0.0);
        assert!((snap.states[0].theta1 - (PI - 0.001)).abs() < 1e-15);
    }

    #[test]
    fn test_invalid_config_prevents_construction() {
        let config = RotorConfig::builder().dt(0.0).build();
        assert!(RotorEngine::new(config).is_err());

        let config = RotorConfig::builder().window_width(-5.0).build();
        assert!(RotorEngine::new(config).is_err());
    }

    #[test]
    fn test_oversized_history_window_prevents_construction() {
        let config = RotorConfig::builder().window_width(1.0).dt(1e-300).build();
        let err = RotorEngine::new(config).unwrap_err();
        assert!(matches!(err, SimError::Config { .. }));
    }

    #[test]
    fn test_unusable_tolerance_prevents_construction() {
        let solver = SolverConfig {
            atol: f64::NAN,
            ..SolverConfig::default()
        };
        let config = RotorConfig::builder().solver(solver).build();
        assert!(matches!(
            RotorEngine::new(config),
            Err(SimError::Config { .. })
        ));
    }

    #[test]
    fn test_non_finite_initial_conditions_prevent_construction() {
        let initial = InitialConditions {
            omega1: f64::NAN,
            ..InitialConditions::default()
        };
        let config = RotorConfig::builder().initial(initial).build();
        let err = RotorEngine::new(config).unwrap_err();
        assert!(matches!(err, SimError::InvalidInput { field: "omega1", .. }));
    }

    #[test]
    fn test_step_from_near_top() {
        let mut e = engine();
        e.reset(PI - 0.001, 0.0, 0.0, 0.0, 2.0, 9.81).unwrap();
        let (t, s) = e.step().into_parts();

        assert!((t - 0.02).abs() < 1e-15);
        assert!(s.theta1 < PI - 0.001);
        assert!(s.omega1 < 0.0);
        // ω1' ≈ -g sin θ1 - J sin(θ1 - θ2) at the start of the step.
        let expected = (-9.81 * (PI - 0.001).sin() - 2.0 * (PI - 0.001).sin()) * 0.02;
        assert!((s.omega1 - expected).abs() < 1e-5, "omega1 = {}", s.omega1);
    }

    #[test]
    fn test_resting_state_stays_at_rest() {
        let mut e = engine();
        e.reset(0.0, 0.0, 0.0, 0.0, 2.0, 9.81).unwrap();
        for _ in 0..10 {
            assert!(e.step().is_accepted());
        }
        assert_eq!(*e.state(), RotorState::default());
        let snap = e.history_snapshot();
        assert!(snap.energies.iter().all(|&(a, b, c)| a == 0.0 && b == 0.0 && c == 0.0));
    }

    #[test]
    fn test_rejected_step_is_idempotent() {
        let mut e =
            RotorEngine::with_stepper(RotorConfig::default(), Box::new(FailingStepper)).unwrap();
        e.reset(1.0, 0.5, -1.0, 0.0, 2.0, 9.81).unwrap();
        let before_state = *e.state();
        let before_len = e.history().len();

        let outcome = e.step();
        assert!(!outcome.is_accepted());
        assert_eq!(outcome.time(), 0.0);
        assert_eq!(*outcome.state(), before_state);
        assert_eq!(e.time(), 0.0);
        assert_eq!(*e.state(), before_state);
        assert_eq!(e.history().len(), before_len);
        assert_eq!(e.rejected_steps(), 1);

        let err = outcome.into_result().unwrap_err();
        assert!(matches!(err, SimError::Integration(_)));
    }

    #[test]
    fn test_non_finite_result_is_rejected() {
        let mut e = RotorEngine::with_stepper(RotorConfig::default(), Box::new(NanStepper)).unwrap();
        let before = *e.state();
        match e.step() {
            StepOutcome::Rejected { reason, state, .. } => {
                assert_eq!(state, before);
                assert!(matches!(reason, RejectReason::Jidoka(_)));
                let err: SimError = reason.into();
                assert!(matches!(err, SimError::NonFiniteValue { .. }));
            }
            StepOutcome::Accepted { .. } => panic!("NaN state must be rejected"),
        }
        assert_eq!(e.history().len(), 1);
    }

    #[test]
    fn test_invalid_reset_leaves_state_intact() {
        let mut e = engine();
        e.run_steps(5);
        let time = e.time();
        let state = *e.state();
        let len = e.history().len();

        let err = e.reset(0.0, 0.0, f64::INFINITY, 0.0, 1.0, 1.0).unwrap_err();
        assert!(matches!(err, SimError::InvalidInput { field: "theta2", .. }));
        let err = e.reset(0.0, 0.0, 0.0, 0.0, f64::NAN, 1.0).unwrap_err();
        assert!(matches!(err, SimError::InvalidInput { field: "coupling", .. }));

        assert_eq!(e.time(), time);
        assert_eq!(*e.state(), state);
        assert_eq!(e.history().len(), len);
    }

    #[test]
    fn test_reset_clears_history_to_seed() {
        let mut e = engine();
        e.run_steps(300);
        assert_eq!(e.history().len(), e.history().capacity());

        e.reset(0.1, 0.0, 0.2, 0.0, 1.0, 9.81).unwrap();
        let snap = e.history_snapshot();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap.times, vec![0.0]);
        assert_eq!(e.accepted_steps(), 0);
    }

    #[test]
    fn test_energy_conserved_over_short_window() {
        let mut e = engine();
        e.reset(2.0, 0.0, -1.0, 1.5, 2.0, 9.81).unwrap();
        let e0 = e.history_snapshot().energies[0].2;
        e.run_steps(100);
        let snap = e.history_snapshot();
        for &(_, _, total) in &snap.energies {
            assert!((total - e0).abs() < 1e-4, "drift {}", total - e0);
        }
        assert!(e.energy_drift() < 1e-4);
    }

    #[test]
    fn test_accepted_counters_and_stats() {
        let mut e = engine();
        assert_eq!(e.run_steps(10), 10);
        assert_eq!(e.accepted_steps(), 10);
        assert_eq!(e.rejected_steps(), 0);
        assert!(e.solver_stats().accepted_steps >= 10);
        assert!((e.time() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_debug_output() {
        let debug = format!("{:?}", engine());
        assert!(debug.contains("RotorEngine"));
        assert!(debug.contains("dopri5"));
    }

    #[test]
    fn test_bob_positions_use_arm_length() {
        let config = RotorConfig::builder().arm_length(2.0).build();
        let mut e = RotorEngine::new(config).unwrap();
        e.reset(0.0, 0.0, 0.0, 0.0, 0.0, 9.81).unwrap();
        let [b1, _] = e.bob_positions();
        assert!((b1.1 + 2.0).abs() < 1e-12);
    }
}
