//! # CLI Layer
//!
//! One client of the servicenotes library. This is the only place that
//! knows about stdout/stderr and exit codes; everything it shows comes from
//! `RecordStore` return values.
//!
//! Record numbers on the command line start at 1 and are converted to the
//! store's zero-based positions in `commands.rs`.
//!
//! ## Structure
//!
//! - `setup.rs`: clap definitions
//! - `commands.rs`: context setup and per-command handlers
//! - `render.rs`: text formatting

mod commands;
mod render;
mod setup;

use clap::Parser;
use setup::Cli;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Parse arguments, run the command, and return the process exit code.
/// The shutdown backup has been taken by the time this returns.
pub fn run() -> i32 {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match commands::execute(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: {}", commands::describe_error(&e));
            1
        }
    }
}

/// Logs go to stderr so command output on stdout stays clean. `RUST_LOG`
/// overrides the level picked by `--verbose`.
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}
