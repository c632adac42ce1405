//! CLI command handlers.
//!
//! Each handler returns an `ExitCode`; the work itself lives in functions
//! returning `SimResult` so tests can inspect it.

use std::path::Path;
use std::process::ExitCode;

use serde::Serialize;
use tracing::info;

use super::output::{print_help, print_presets, print_run_report, print_version, write_csv};
use super::{Args, Command};
use crate::config::RotorConfig;
use crate::engine::{RotorEngine, RotorState};
use crate::error::SimResult;
use crate::history::HistorySnapshot;
use crate::physics::integrator::SolverStats;
use crate::scenarios::Preset;

/// Main CLI entry point.
///
/// Dispatches to the appropriate command handler based on parsed arguments.
#[must_use]
pub fn run_cli(args: Args) -> ExitCode {
    match args.command {
        Command::Run {
            config_path,
            preset,
            steps,
            csv,
        } => run_simulation(config_path.as_deref(), preset.as_deref(), steps, csv),
        Command::Presets => {
            print_presets();
            ExitCode::SUCCESS
        }
        Command::Help => {
            print_help();
            ExitCode::SUCCESS
        }
        Command::Version => {
            print_version();
            ExitCode::SUCCESS
        }
    }
}

/// Outcome of a headless run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Where the initial conditions came from.
    pub source: String,
    /// Steps asked for.
    pub steps_requested: u64,
    /// Steps accepted.
    pub accepted: u64,
    /// Steps rejected.
    pub rejected: u64,
    /// Final simulation time.
    pub time: f64,
    /// Final state.
    pub state: RotorState,
    /// Total energy at reset.
    pub initial_energy: f64,
    /// Total energy of the last record.
    pub final_energy: f64,
    /// Relative energy drift.
    pub energy_drift: f64,
    /// Internal solver statistics.
    pub stats: SolverStats,
    /// Final history window.
    pub snapshot: HistorySnapshot,
}

/// Run the simulation and print its summary.
#[must_use]
pub fn run_simulation(
    config_path: Option<&Path>,
    preset: Option<&str>,
    steps: u64,
    csv: bool,
) -> ExitCode {
    let report = match execute_run(config_path, preset, steps) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(1);
        }
    };

    if csv {
        if let Err(e) = write_csv(std::io::stdout().lock(), &report.snapshot) {
            eprintln!("Error writing CSV: {e}");
            return ExitCode::from(1);
        }
    } else {
        print_run_report(&report);
    }
    ExitCode::SUCCESS
}

/// Build an engine from the given sources, take `steps` macro steps and
/// collect the results.
///
/// # Errors
///
/// Returns error if the configuration cannot be loaded or validated, or
/// the preset name is unknown.
pub fn execute_run(
    config_path: Option<&Path>,
    preset: Option<&str>,
    steps: u64,
) -> SimResult<RunReport> {
    let mut config = match config_path {
        Some(path) => RotorConfig::load(path)?,
        None => RotorConfig::default(),
    };
    let source = match preset {
        Some(name) => {
            let preset = Preset::from_name(name)?;
            config.initial = preset.initial_conditions();
            format!("preset {preset}")
        }
        None => config_path.map_or_else(
            || format!("preset {}", Preset::default()),
            |p| format!("config {}", p.display()),
        ),
    };

    let mut engine = RotorEngine::new(config)?;
    let initial_energy = engine
        .latest_record()
        .map_or(0.0, |r| r.energy.total);

    info!(%source, steps, "starting headless run");
    let accepted = engine.run_steps(steps);

    let snapshot = engine.history_snapshot();
    let final_energy = engine
        .latest_record()
        .map_or(initial_energy, |r| r.energy.total);

    Ok(RunReport {
        source,
        steps_requested: steps,
        accepted,
        rejected: engine.rejected_steps(),
        time: engine.time(),
        state: *engine.state(),
        initial_energy,
        final_energy,
        energy_drift: engine.energy_drift(),
        stats: engine.solver_stats(),
        snapshot,
    })
}
