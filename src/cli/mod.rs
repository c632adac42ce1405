//! CLI module for rotorsim.
//!
//! All CLI logic lives here rather than in main.rs so it can be tested.
//! The entry point `run_cli` is called from main.rs with parsed arguments.

mod args;
mod commands;
mod output;

pub use args::{Args, Command, DEFAULT_STEPS};
pub use commands::{execute_run, run_cli, run_simulation, RunReport};
pub use output::{
    format_presets, format_run_report, print_help, print_presets, print_run_report,
    print_version, version_string, write_csv,
};
