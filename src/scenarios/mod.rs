//! Pre-built initial conditions.
//!
//! Provides ready-to-use starting points for common coupled-rotator runs:
//! - Falling from the top (unstable equilibrium, the default)
//! - At rest (stable equilibrium)
//! - In-phase and anti-phase normal modes
//! - Whirling (one rotator spinning over the top)

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::config::InitialConditions;
use crate::error::{SimError, SimResult};

/// Named starting configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    /// Rotator 1 just off the upright position, rotator 2 hanging.
    #[default]
    FallingFromTop,
    /// Both hanging at rest. Nothing moves.
    Resting,
    /// Equal displacement; the coupling spring stays relaxed.
    InPhase,
    /// Opposite displacement; the coupling spring is loaded.
    AntiPhase,
    /// Rotator 1 given enough speed to go over the top.
    Whirling,
}

impl Preset {
    /// Every preset, in display order.
    pub const ALL: [Self; 5] = [
        Self::FallingFromTop,
        Self::Resting,
        Self::InPhase,
        Self::AntiPhase,
        Self::Whirling,
    ];

    /// Identifier used on the command line.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FallingFromTop => "falling_from_top",
            Self::Resting => "resting",
            Self::InPhase => "in_phase",
            Self::AntiPhase => "anti_phase",
            Self::Whirling => "whirling",
        }
    }

    /// One-line description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::FallingFromTop => "rotator 1 released 1 mrad from upright",
            Self::Resting => "both rotators hanging at rest",
            Self::InPhase => "both displaced +0.3 rad, coupling relaxed",
            Self::AntiPhase => "displaced ±0.3 rad, coupling loaded",
            Self::Whirling => "rotator 1 spinning over the top at 8 rad/s",
        }
    }

    /// Look up a preset by name. Hyphens are accepted for underscores.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Config` for an unknown name.
    pub fn from_name(name: &str) -> SimResult<Self> {
        let normalized = name.trim().replace('-', "_").to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.name() == normalized)
            .ok_or_else(|| SimError::config(format!("unknown preset '{name}'")))
    }

    /// Initial conditions for this preset.
    #[must_use]
    pub fn initial_conditions(self) -> InitialConditions {
        let base = InitialConditions::default();
        match self {
            Self::FallingFromTop => base,
            Self::Resting => InitialConditions {
                theta1: 0.0,
                ..base
            },
            Self::InPhase => InitialConditions {
                theta1: 0.3,
                theta2: 0.3,
                ..base
            },
            Self::AntiPhase => InitialConditions {
                theta1: 0.3,
                theta2: -0.3,
                ..base
            },
            Self::Whirling => InitialConditions {
                theta1: 0.0,
                omega1: 8.0,
                theta2: PI / 6.0,
                ..base
            },
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Preset {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::physics::derived::EnergyBreakdown;
    use crate::engine::state::{PhysicalParams, RotorState};

    fn energy(ic: &InitialConditions) -> EnergyBreakdown {
        EnergyBreakdown::of(
            &RotorState::new(ic.theta1, ic.omega1, ic.theta2, ic.omega2),
            &PhysicalParams::new(ic.coupling, ic.gravity),
        )
    }

    #[test]
    fn test_default_matches_config_default() {
        assert_eq!(
            Preset::default().initial_conditions(),
            InitialConditions::default()
        );
    }

    #[test]
    fn test_lookup_by_name() {
        for preset in Preset::ALL {
            assert_eq!(Preset::from_name(preset.name()).unwrap(), preset);
            assert_eq!(preset.to_string().parse::<Preset>().unwrap(), preset);
        }
        assert_eq!(Preset::from_name("Anti-Phase").unwrap(), Preset::AntiPhase);
        assert!(matches!(
            Preset::from_name("chaotic"),
            Err(SimError::Config { .. })
        ));
    }

    #[test]
    fn test_resting_has_zero_energy() {
        assert_eq!(energy(&Preset::Resting.initial_conditions()).total, 0.0);
    }

    #[test]
    fn test_in_phase_coupling_relaxed() {
        let e = energy(&Preset::InPhase.initial_conditions());
        assert!(e.coupling().abs() < 1e-15);
    }

    #[test]
    fn test_anti_phase_coupling_loaded() {
        let e = energy(&Preset::AntiPhase.initial_conditions());
        assert!(e.coupling() > 0.0);
    }

    #[test]
    fn test_whirling_can_clear_the_top() {
        let ic = Preset::Whirling.initial_conditions();
        // Kinetic energy must exceed the potential barrier 2g.
        assert!(0.5 * ic.omega1 * ic.omega1 > 2.0 * ic.gravity);
    }

    #[test]
    fn test_all_presets_finite() {
        for preset in Preset::ALL {
            let ic = preset.initial_conditions();
            assert!(energy(&ic).total.is_finite(), "{preset}");
        }
    }
}
