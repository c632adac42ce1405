//! Configuration system with YAML schema and validation.
//!
//! Implements Poka-Yoke (mistake-proofing) through:
//! - Type-safe configuration structs
//! - Schema validation via `validator`
//! - Runtime semantic validation (positive window and step)
//!
//! A [`RotorConfig`] is built once, validated, and then handed to the
//! engine by value. Nothing in it changes for the lifetime of the engine.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use validator::Validate;

use crate::engine::jidoka::JidokaConfig;
use crate::error::{SimError, SimResult};

/// Largest history window, in records, a configuration may ask for.
pub const MAX_HISTORY_CAPACITY: usize = 10_000_000;

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RotorConfig {
    /// Arm length in metres. Used for rendering only, never by the physics.
    #[validate(range(min = 0.0))]
    #[serde(default = "default_arm_length")]
    pub arm_length: f64,

    /// Width of the retained history window in seconds.
    #[serde(default = "default_window_width")]
    pub window_width: f64,

    /// Macro step (reporting interval) in seconds.
    #[serde(default = "default_dt")]
    pub dt: f64,

    /// Wall-clock cadence hint for the driver, in milliseconds.
    #[validate(range(min = 1))]
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Adaptive solver settings.
    #[validate(nested)]
    #[serde(default)]
    pub solver: SolverConfig,

    /// Initial conditions applied when the engine is constructed.
    #[serde(default)]
    pub initial: InitialConditions,

    /// Jidoka (anomaly detection) configuration.
    #[serde(default)]
    pub jidoka: JidokaConfig,
}

fn default_arm_length() -> f64 {
    1.0
}

fn default_window_width() -> f64 {
    5.0
}

fn default_dt() -> f64 {
    0.02
}

fn default_tick_interval_ms() -> u64 {
    20
}

impl RotorConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - YAML parsing fails
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> SimResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "loading rotor configuration");
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML string.
    ///
    /// # Errors
    ///
    /// Returns error if parsing or validation fails.
    pub fn from_yaml(yaml: &str) -> SimResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.check()?;
        Ok(config)
    }

    /// Create a builder for configuration.
    #[must_use]
    pub fn builder() -> RotorConfigBuilder {
        RotorConfigBuilder::default()
    }

    /// Run schema and semantic validation.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` for schema violations and
    /// `SimError::Config` for semantic ones.
    pub fn check(&self) -> SimResult<()> {
        self.validate()?;
        self.validate_semantic()
    }

    /// Validate semantic constraints beyond schema.
    fn validate_semantic(&self) -> SimResult<()> {
        if !self.window_width.is_finite() || self.window_width <= 0.0 {
            return Err(SimError::config(format!(
                "window_width must be positive, got {}",
                self.window_width
            )));
        }
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(SimError::config(format!(
                "dt must be positive, got {}",
                self.dt
            )));
        }
        for (name, value) in [("rtol", self.solver.rtol), ("atol", self.solver.atol)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SimError::config(format!(
                    "solver {name} must be positive and finite, got {value}"
                )));
            }
        }
        self.history_capacity()?;
        Ok(())
    }

    /// Number of slots in the history ring buffer: `ceil(W / dt) + 2`.
    ///
    /// Ratios within `1e-9` of an integer are snapped first, so that
    /// `5.0 / 0.02` counts as 250 rather than 251.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` if the window would exceed
    /// [`MAX_HISTORY_CAPACITY`] records.
    pub fn history_capacity(&self) -> SimResult<usize> {
        let ratio = self.window_width / self.dt;
        let nearest = ratio.round();
        let slots = if (ratio - nearest).abs() < 1e-9 * nearest.max(1.0) {
            nearest
        } else {
            ratio.ceil()
        };
        let too_large = || {
            SimError::config(format!(
                "window_width / dt = {ratio:e} exceeds the history limit of {MAX_HISTORY_CAPACITY} records"
            ))
        };
        if !(0.0..=MAX_HISTORY_CAPACITY as f64).contains(&slots) {
            return Err(too_large());
        }
        (slots as usize)
            .checked_add(2)
            .filter(|&n| n <= MAX_HISTORY_CAPACITY)
            .ok_or_else(too_large)
    }
}

impl Default for RotorConfig {
    fn default() -> Self {
        Self {
            arm_length: default_arm_length(),
            window_width: default_window_width(),
            dt: default_dt(),
            tick_interval_ms: default_tick_interval_ms(),
            solver: SolverConfig::default(),
            initial: InitialConditions::default(),
            jidoka: JidokaConfig::default(),
        }
    }
}

/// Configuration builder for programmatic construction.
#[derive(Debug, Default)]
pub struct RotorConfigBuilder {
    window_width: Option<f64>,
    dt: Option<f64>,
    arm_length: Option<f64>,
    solver: Option<SolverConfig>,
    initial: Option<InitialConditions>,
    jidoka: Option<JidokaConfig>,
}

impl RotorConfigBuilder {
    /// Set the history window width in seconds.
    #[must_use]
    pub const fn window_width(mut self, seconds: f64) -> Self {
        self.window_width = Some(seconds);
        self
    }

    /// Set the macro step in seconds.
    #[must_use]
    pub const fn dt(mut self, dt: f64) -> Self {
        self.dt = Some(dt);
        self
    }

    /// Set the rendering arm length.
    #[must_use]
    pub const fn arm_length(mut self, length: f64) -> Self {
        self.arm_length = Some(length);
        self
    }

    /// Set the solver configuration.
    #[must_use]
    pub const fn solver(mut self, solver: SolverConfig) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Set the initial conditions.
    #[must_use]
    pub const fn initial(mut self, initial: InitialConditions) -> Self {
        self.initial = Some(initial);
        self
    }

    /// Set Jidoka configuration.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn jidoka(mut self, config: JidokaConfig) -> Self {
        self.jidoka = Some(config);
        self
    }

    /// Build the configuration. Validation happens at engine construction.
    #[must_use]
    pub fn build(self) -> RotorConfig {
        let mut config = RotorConfig::default();

        if let Some(w) = self.window_width {
            config.window_width = w;
        }
        if let Some(dt) = self.dt {
            config.dt = dt;
        }
        if let Some(l) = self.arm_length {
            config.arm_length = l;
        }
        if let Some(solver) = self.solver {
            config.solver = solver;
        }
        if let Some(initial) = self.initial {
            config.initial = initial;
        }
        if let Some(jidoka) = self.jidoka {
            config.jidoka = jidoka;
        }

        config
    }
}

/// Adaptive solver configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct SolverConfig {
    /// Relative error tolerance.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_rtol")]
    pub rtol: f64,

    /// Absolute error tolerance.
    #[validate(range(min = 0.0, max = 1.0))]
    #[serde(default = "default_atol")]
    pub atol: f64,

    /// Internal substep budget per macro step.
    #[validate(range(min = 1))]
    #[serde(default = "default_max_substeps")]
    pub max_substeps: u32,
}

fn default_rtol() -> f64 {
    1e-7
}

fn default_atol() -> f64 {
    1e-6
}

fn default_max_substeps() -> u32 {
    10_000
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            rtol: default_rtol(),
            atol: default_atol(),
            max_substeps: default_max_substeps(),
        }
    }
}

/// Initial conditions and physical parameters for a reset.
///
/// Ranges are a UI convention (angles in `[-π, π]`, velocities in
/// `[-20, 20]`, `coupling` in `[0, 50]`, `gravity` in `[0, 20]`) and are
/// not enforced here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InitialConditions {
    /// Angle of rotator 1 (rad).
    pub theta1: f64,
    /// Angular velocity of rotator 1 (rad/s).
    pub omega1: f64,
    /// Angle of rotator 2 (rad).
    pub theta2: f64,
    /// Angular velocity of rotator 2 (rad/s).
    pub omega2: f64,
    /// Coupling strength `J` (N·m).
    pub coupling: f64,
    /// Gravitational acceleration `g` (m/s²).
    pub gravity: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            theta1: std::f64::consts::PI - 0.001,
            omega1: 0.0,
            theta2: 0.0,
            omega2: 0.0,
            coupling: 2.0,
            gravity: 9.81,
        }
    }
}
