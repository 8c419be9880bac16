//! Tracing setup for the `st` binary.
//!
//! All diagnostics go to stderr so that command output (including robot
//! JSON) stays clean on stdout. Robot mode switches the diagnostics
//! themselves to JSON lines; otherwise output is plain text, colored only
//! when stderr is a terminal.

use std::io::{self, IsTerminal};

use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Map the CLI's `--quiet`/`-v` flags to a filter directive.
///
/// Quiet wins over any verbosity count: `-q` means errors only.
fn directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "st=error";
    }
    match verbose {
        0 => "st=info",
        1 => "st=debug",
        _ => "st=trace",
    }
}

/// Install the global subscriber. `RUST_LOG` overrides the flag-derived
/// filter when set.
pub fn init_logging(robot_mode: bool, verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(directive(verbose, quiet)));

    let layer: Box<dyn Layer<Layered<EnvFilter, Registry>> + Send + Sync> = if robot_mode {
        fmt::layer()
            .json()
            .with_target(true)
            .with_writer(io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_ansi(io::stderr().is_terminal())
            .with_writer(io::stderr)
            .boxed()
    };

    tracing_subscriber::registry().with(filter).with(layer).init();
}
