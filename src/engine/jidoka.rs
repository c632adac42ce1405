//! Jidoka (自働化) - Autonomous anomaly detection.
//!
//! Runs after every integration, before a state is committed:
//!
//! 1. **Non-finite values**: NaN or Inf in the new state stops the step.
//!    The engine rejects it and keeps the previous state.
//! 2. **Energy drift**: the system has no driving or damping, so total
//!    energy should stay at its reset value up to integration error. Drift
//!    is classified with graduated severity and logged, never enforced.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::state::RotorState;

/// Severity levels for energy drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ViolationSeverity {
    /// Within tolerance.
    Acceptable,
    /// Approaching tolerance (log, continue).
    Warning,
    /// Tolerance exceeded (log, continue).
    Critical,
    /// Drift is NaN/Inf.
    Fatal,
}

/// A state that must not be committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JidokaViolation {
    /// Non-finite value (NaN or Inf) detected.
    NonFiniteValue {
        /// Component name, e.g. `state.omega1`.
        location: String,
        /// The non-finite value itself.
        value: f64,
    },
}

impl std::fmt::Display for JidokaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonFiniteValue { location, value } => {
                write!(f, "non-finite value {value} at {location}")
            }
        }
    }
}

/// Jidoka guard configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JidokaConfig {
    /// Relative energy drift considered critical.
    #[serde(default = "default_energy_tolerance")]
    pub energy_tolerance: f64,
    /// Fraction of the tolerance at which to start warning.
    #[serde(default = "default_warning_fraction")]
    pub warning_fraction: f64,
    /// NaN/Inf detection enabled.
    #[serde(default = "default_true")]
    pub check_finite: bool,
    /// Energy drift monitoring enabled.
    #[serde(default = "default_true")]
    pub check_energy: bool,
}

fn default_energy_tolerance() -> f64 {
    1e-4
}

fn default_warning_fraction() -> f64 {
    0.8
}

fn default_true() -> bool {
    true
}

impl Default for JidokaConfig {
    fn default() -> Self {
        Self {
            energy_tolerance: default_energy_tolerance(),
            warning_fraction: default_warning_fraction(),
            check_finite: true,
            check_energy: true,
        }
    }
}

/// Jidoka guard for autonomous anomaly detection.
///
/// # Example
///
/// ```rust
/// use rotorsim::engine::jidoka::{JidokaConfig, JidokaGuard, ViolationSeverity};
/// use rotorsim::engine::state::RotorState;
///
/// let mut guard = JidokaGuard::new(JidokaConfig::default());
/// assert!(guard.check_state(&RotorState::default()).is_ok());
///
/// guard.arm(10.0);
/// assert_eq!(guard.observe_energy(10.0), ViolationSeverity::Acceptable);
/// ```
#[derive(Debug, Clone)]
pub struct JidokaGuard {
    config: JidokaConfig,
    /// Energy at the last reset.
    reference_energy: Option<f64>,
    /// Most recent relative drift.
    last_drift: f64,
    /// Highest severity reported since reset, to avoid log floods.
    reported: ViolationSeverity,
}

impl JidokaGuard {
    /// Create a new guard.
    #[must_use]
    pub const fn new(config: JidokaConfig) -> Self {
        Self {
            config,
            reference_energy: None,
            last_drift: 0.0,
            reported: ViolationSeverity::Acceptable,
        }
    }

    /// Record the reference energy for a new run.
    pub fn arm(&mut self, energy: f64) {
        self.reference_energy = Some(energy);
        self.last_drift = 0.0;
        self.reported = ViolationSeverity::Acceptable;
    }

    /// Check a candidate state before it is committed.
    ///
    /// # Errors
    ///
    /// Returns `JidokaViolation::NonFiniteValue` naming the first bad component.
    pub fn check_state(&self, state: &RotorState) -> Result<(), JidokaViolation> {
        if !self.config.check_finite {
            return Ok(());
        }
        match state.first_non_finite() {
            None => Ok(()),
            Some((name, value)) => Err(JidokaViolation::NonFiniteValue {
                location: format!("state.{name}"),
                value,
            }),
        }
    }

    /// Compare total energy against the reference and classify the drift.
    ///
    /// Drift is relative to `max(|E0|, 1)` so a system starting at rest
    /// does not divide by zero. Each severity level is logged once per run.
    pub fn observe_energy(&mut self, energy: f64) -> ViolationSeverity {
        if !self.config.check_energy {
            return ViolationSeverity::Acceptable;
        }
        let Some(reference) = self.reference_energy else {
            return ViolationSeverity::Acceptable;
        };

        let drift = (energy - reference).abs() / reference.abs().max(1.0);
        self.last_drift = drift;
        let severity = self.classify(drift);

        if severity > self.reported {
            self.reported = severity;
            warn!(
                drift,
                tolerance = self.config.energy_tolerance,
                ?severity,
                "energy drift"
            );
        }
        severity
    }

    /// Classify a relative drift.
    #[must_use]
    pub fn classify(&self, drift: f64) -> ViolationSeverity {
        let tolerance = self.config.energy_tolerance;
        if !drift.is_finite() {
            ViolationSeverity::Fatal
        } else if drift > tolerance {
            ViolationSeverity::Critical
        } else if drift > tolerance * self.config.warning_fraction {
            ViolationSeverity::Warning
        } else {
            ViolationSeverity::Acceptable
        }
    }

    /// Relative drift at the last observation.
    #[must_use]
    pub const fn last_drift(&self) -> f64 {
        self.last_drift
    }

    /// Get current configuration.
    #[must_use]
    pub const fn config(&self) -> &JidokaConfig {
        &self.config
    }
}
