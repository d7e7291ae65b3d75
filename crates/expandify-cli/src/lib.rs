pub mod cli;
pub mod commands;
pub mod utils;

use clap::Parser;
use cli::{Commands, Expandify};
use commands::handle_command;
use std::process;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "EXPANDIFY_LOG";

/// Default filter when `EXPANDIFY_LOG` is unset.
pub fn default_log_level(verbose: bool, worker: bool) -> &'static str {
    match (verbose, worker) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "warn",
    }
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}

/// Run the expandify CLI application
pub fn run_main() {
    let args = Expandify::parse();
    let worker = matches!(args.commands, Commands::DaemonWorker);
    init_logging(default_log_level(args.verbose, worker));

    if let Err(e) = handle_command(args.commands) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
