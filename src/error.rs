//! Error types for rotorsim.
//!
//! All fallible operations return `Result<T, SimError>` instead of panicking.
//! A rejected integration step is *not* an error: it is reported through
//! [`crate::engine::StepOutcome::Rejected`] and leaves the engine untouched.

use thiserror::Error;

use crate::physics::integrator::IntegrationError;

/// Result type alias for rotorsim operations.
pub type SimResult<T> = Result<T, SimError>;

/// Unified error type for all rotorsim operations.
#[derive(Debug, Error)]
pub enum SimError {
    // ===== Configuration Errors =====
    /// Invalid configuration parameter. Fatal at engine construction.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// YAML parsing error.
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// Schema validation error.
    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    // ===== Caller Input Errors =====
    /// Non-finite argument passed to `reset`.
    #[error("Invalid input: {field} = {value} is not finite")]
    InvalidInput {
        /// Name of the offending argument.
        field: &'static str,
        /// The rejected value.
        value: f64,
    },

    // ===== Numerical Errors =====
    /// Numerical instability detected (NaN or Inf).
    #[error("Jidoka: non-finite value detected at {location}")]
    NonFiniteValue {
        /// Location where the non-finite value was detected.
        location: String,
    },

    /// The adaptive solver could not meet its tolerance.
    #[error("Integration error: {0}")]
    Integration(#[from] IntegrationError),

    // ===== Host Errors =====
    /// The shared engine lock was poisoned by a panicking holder.
    #[error("Engine lock poisoned")]
    LockPoisoned,

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Create a configuration error with a message.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the driver may simply retry on its next tick.
    ///
    /// Integration failures and non-finite intermediate states leave the
    /// previous state intact; configuration and I/O errors do not heal.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Integration(_) | Self::NonFiniteValue { .. } | Self::InvalidInput { .. }
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_error_config() {
        let err = SimError::config("dt must be positive");
        assert!(!err.is_recoverable());
        let msg = err.to_string();
        assert!(msg.contains("Configuration error"));
        assert!(msg.contains("dt must be positive"));
    }

    #[test]
    fn test_error_invalid_input_display() {
        let err = SimError::InvalidInput {
            field: "theta1",
            value: f64::NAN,
        };
        assert!(err.is_recoverable());
        let msg = err.to_string();
        assert!(msg.contains("theta1"));
        assert!(msg.contains("not finite"));
    }

    #[test]
    fn test_error_integration_from() {
        let err: SimError = IntegrationError::MaxSubstepsExceeded { budget: 10 }.into();
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Integration error"));
    }

    #[test]
    fn test_error_non_finite_display() {
        let err = SimError::NonFiniteValue {
            location: "state.omega2".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("state.omega2"));
    }

    #[test]
    fn test_error_lock_poisoned() {
        let err = SimError::LockPoisoned;
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("poisoned"));
    }

    #[test]
    fn test_error_io() {
        let err = SimError::Io(std::io::Error::other("missing file"));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("missing file"));
    }
}
