//! Physics of the coupled rotators.
//!
//! - [`dynamics`]: the vector field
//! - [`integrator`]: adaptive Dormand-Prince stepping across one macro step
//! - [`derived`]: energies and angle unwrapping computed on ingestion

pub mod derived;
pub mod dynamics;
pub mod integrator;

pub use derived::{wrap_angle, AngleUnwrapper, EnergyBreakdown};
pub use dynamics::{CoupledRotators, OdeSystem};
pub use integrator::{DormandPrince, IntegrationError, SolverStats, Stepper};
