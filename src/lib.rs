//! # rotorsim
//!
//! Simulation engine for two rotators coupled by a torsion spring and
//! pulled by gravity.
//!
//! - Adaptive Dormand-Prince integration across fixed macro steps
//! - Energies and unwrapped angles computed once per accepted sample
//! - A fixed-capacity history window read out in chronological order
//! - Jidoka checks that keep non-finite states out of the history
//!
//! ## Example
//!
//! ```rust
//! use rotorsim::prelude::*;
//!
//! let config = RotorConfig::builder()
//!     .window_width(5.0)
//!     .dt(0.02)
//!     .build();
//! let mut engine = RotorEngine::new(config).unwrap();
//!
//! for _ in 0..10 {
//!     engine.step();
//! }
//! let snapshot = engine.history_snapshot();
//! assert_eq!(snapshot.len(), 11);
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(
    clippy::module_name_repetitions,
    clippy::similar_names,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::suboptimal_flops,  // Tableau arithmetic reads better unfused
    clippy::imprecise_flops,
    clippy::many_single_char_names,
    clippy::too_many_lines,
    clippy::missing_const_for_fn,
    clippy::needless_range_loop,   // Stage loops index several arrays at once
    clippy::format_push_string,
)]

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod physics;
pub mod scenarios;
pub mod telemetry;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::{InitialConditions, RotorConfig, RotorConfigBuilder, SolverConfig};
    pub use crate::engine::jidoka::{JidokaConfig, JidokaGuard, ViolationSeverity};
    pub use crate::engine::{
        PhysicalParams, RejectReason, RotorEngine, RotorState, SharedEngine, StepOutcome,
    };
    pub use crate::error::{SimError, SimResult};
    pub use crate::history::{HistoryRecord, HistorySnapshot};
    pub use crate::physics::{EnergyBreakdown, IntegrationError, SolverStats};
    pub use crate::scenarios::Preset;
}

/// Re-export for public API
pub use error::{SimError, SimResult};
