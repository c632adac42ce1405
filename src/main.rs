//! rotorsim CLI - headless coupled rotator simulation
//!
//! Command-line interface for running the simulation without a display.

use std::process::ExitCode;

use rotorsim::cli::{run_cli, Args};
use rotorsim::telemetry::init_tracing;

fn main() -> ExitCode {
    init_tracing();
    run_cli(Args::parse())
}
