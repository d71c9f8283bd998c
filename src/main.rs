//! Topoforge CLI: three-tier cloud topology generator.

use clap::Parser;
use topoforge::cli::Cli;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const LOG_ENV: &str = "TOPOFORGE_LOG";

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("topoforge=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("topoforge=warn"))
    };
    // Already initialized only happens under test harnesses
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    if let Err(e) = topoforge::cli::dispatch(cli.command) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}
