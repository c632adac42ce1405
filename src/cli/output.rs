//! CLI output formatting.
//!
//! Formatting is split from printing so the text can be checked in tests.

use std::io::{self, Write};

use super::commands::RunReport;
use crate::history::HistorySnapshot;
use crate::scenarios::Preset;

/// Print version information.
pub fn print_version() {
    println!("{}", version_string());
}

/// Package version, plus the git revision when built from a checkout.
#[must_use]
pub fn version_string() -> String {
    match option_env!("ROTORSIM_GIT_HASH") {
        Some(hash) => format!("rotorsim {} ({hash})", env!("CARGO_PKG_VERSION")),
        None => format!("rotorsim {}", env!("CARGO_PKG_VERSION")),
    }
}

/// Print help message.
pub fn print_help() {
    println!(
        r"rotorsim - Coupled rotator simulation

USAGE:
    rotorsim <COMMAND> [OPTIONS]

COMMANDS:
    run                         Run the simulation headless
        -c, --config <FILE>     Load configuration from YAML
        -p, --preset <NAME>     Start from a named preset
        -n, --steps <N>         Number of macro steps (default: 500)
        --csv                   Print the final history window as CSV

    presets                     List built-in presets

    help                        Show this help message
    version                     Show version information

EXAMPLES:
    rotorsim run
    rotorsim run --preset whirling --steps 1000
    rotorsim run --config rotor.yaml --csv > window.csv

LOGGING:
    Set RUST_LOG (e.g. RUST_LOG=rotorsim=debug) to adjust log output.
"
    );
}

/// Print the preset table.
pub fn print_presets() {
    print!("{}", format_presets());
}

/// Preset table as text.
#[must_use]
pub fn format_presets() -> String {
    let mut out = String::from("Available presets:\n");
    for preset in Preset::ALL {
        let marker = if preset == Preset::default() { " (default)" } else { "" };
        out.push_str(&format!(
            "  {:<18} {}{marker}\n",
            preset.name(),
            preset.description()
        ));
    }
    out
}

/// Print the end-of-run summary.
pub fn print_run_report(report: &RunReport) {
    print!("{}", format_run_report(report));
}

/// End-of-run summary as text.
#[must_use]
pub fn format_run_report(report: &RunReport) -> String {
    let s = &report.state;
    let status = if report.rejected == 0 { "✓" } else { "⚠" };
    let mut out = String::new();

    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n");
    out.push_str(&format!("Start: {}\n", report.source));
    out.push_str(&format!(
        "Steps: {} requested, {} accepted, {} rejected {status}\n",
        report.steps_requested, report.accepted, report.rejected
    ));
    out.push_str("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━\n\n");

    out.push_str(&format!("Final time: {:.4} s\n", report.time));
    out.push_str("Final state:\n");
    out.push_str(&format!("  θ1 = {:+.6} rad   ω1 = {:+.6} rad/s\n", s.theta1, s.omega1));
    out.push_str(&format!("  θ2 = {:+.6} rad   ω2 = {:+.6} rad/s\n", s.theta2, s.omega2));
    out.push('\n');

    out.push_str("Energy:\n");
    out.push_str(&format!("  Initial: {:.9}\n", report.initial_energy));
    out.push_str(&format!("  Final:   {:.9}\n", report.final_energy));
    out.push_str(&format!("  Drift:   {:.3e} (relative)\n", report.energy_drift));
    out.push('\n');

    out.push_str("Solver:\n");
    out.push_str(&format!("  RHS evaluations: {}\n", report.stats.fn_evals));
    out.push_str(&format!("  Accepted substeps: {}\n", report.stats.accepted_steps));
    out.push_str(&format!("  Rejected substeps: {}\n", report.stats.rejected_steps));
    out.push_str(&format!("\nHistory window: {} samples\n", report.snapshot.len()));
    out
}

/// Write a snapshot as CSV, one row per sample, oldest first.
///
/// # Errors
///
/// Returns any error from the underlying writer.
pub fn write_csv<W: Write>(mut w: W, snapshot: &HistorySnapshot) -> io::Result<()> {
    writeln!(
        w,
        "time,theta1,omega1,theta2,omega2,e1,e2,etotal,unwrapped_theta1,unwrapped_theta2"
    )?;
    let rows = snapshot
        .times
        .iter()
        .zip(&snapshot.states)
        .zip(&snapshot.energies)
        .zip(&snapshot.unwrapped_thetas);
    for (((t, s), (e1, e2, et)), (u1, u2)) in rows {
        writeln!(
            w,
            "{t},{},{},{},{},{e1},{e2},{et},{u1},{u2}",
            s.theta1, s.omega1, s.theta2, s.omega2
        )?;
    }
    Ok(())
}
