//! Tracing subscriber setup for the binary.
//!
//! The library only emits events; installing a subscriber is left to the
//! embedding program. `RUST_LOG` overrides the default `info` filter.

use std::io::IsTerminal;
use std::sync::OnceLock;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

static INITIALISED: OnceLock<()> = OnceLock::new();

/// Install the global fmt subscriber. Later calls are no-ops.
///
/// Returns `true` if this call installed the subscriber.
pub fn init_tracing() -> bool {
    if INITIALISED.set(()).is_err() {
        return false;
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);

    // Another subscriber may already be installed by a host program.
    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .is_ok()
}
