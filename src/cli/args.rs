//! CLI argument parsing.
//!
//! This module provides the argument parser for the rotorsim CLI.
//! Parsing takes any iterator of strings so it can be tested without a
//! process environment.

use std::path::PathBuf;

/// Default number of macro steps for `run` (10 s at the default `dt`).
pub const DEFAULT_STEPS: u64 = 500;

/// CLI arguments container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    /// The command to execute.
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the simulation headless
    Run {
        /// Optional YAML configuration file.
        config_path: Option<PathBuf>,
        /// Optional preset name overriding the configured initial conditions.
        preset: Option<String>,
        /// Number of macro steps to take.
        steps: u64,
        /// Dump the final history window as CSV.
        csv: bool,
    },
    /// List the built-in presets
    Presets,
    /// Show help
    Help,
    /// Show version
    Version,
}

impl Args {
    /// Parse command-line arguments from an iterator.
    ///
    /// The first item is the program name.
    #[must_use]
    pub fn parse_from<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::parse_from_vec(&args)
    }

    /// Parse command-line arguments from the environment.
    #[must_use]
    pub fn parse() -> Self {
        Self::parse_from(std::env::args())
    }

    fn parse_from_vec(args: &[String]) -> Self {
        if args.len() < 2 {
            return Self {
                command: Command::Help,
            };
        }

        let command = match args[1].as_str() {
            "run" => Self::parse_run_command(&args[2..]),
            "presets" => Command::Presets,
            "-h" | "--help" | "help" => Command::Help,
            "-V" | "--version" | "version" => Command::Version,
            unknown => {
                eprintln!("Unknown command: {unknown}");
                Command::Help
            }
        };

        Self { command }
    }

    /// Parse the options following `run`.
    fn parse_run_command(rest: &[String]) -> Command {
        let mut config_path = None;
        let mut preset = None;
        let mut steps = DEFAULT_STEPS;
        let mut csv = false;

        let mut i = 0;
        while i < rest.len() {
            let value = rest.get(i + 1);
            match (rest[i].as_str(), value) {
                ("-c" | "--config", Some(v)) => {
                    config_path = Some(PathBuf::from(v));
                    i += 2;
                }
                ("-p" | "--preset", Some(v)) => {
                    preset = Some(v.clone());
                    i += 2;
                }
                ("-n" | "--steps", Some(v)) => {
                    match v.parse() {
                        Ok(n) => steps = n,
                        Err(_) => eprintln!("Warning: ignoring invalid step count '{v}'"),
                    }
                    i += 2;
                }
                ("--csv", _) => {
                    csv = true;
                    i += 1;
                }
                (flag, None) if flag.starts_with('-') => {
                    eprintln!("Error: '{flag}' requires a value");
                    return Command::Help;
                }
                (other, _) => {
                    eprintln!("Warning: ignoring unexpected argument '{other}'");
                    i += 1;
                }
            }
        }

        Command::Run {
            config_path,
            preset,
            steps,
            csv,
        }
    }
}
