//! Thin binary entry point: installs logging, parses arguments, runs the
//! pipeline, and converts fatal errors to the `[FATAL]`-prefixed stderr
//! message and a non-zero exit code (spec.md §7).

use clap::Parser;
use svprune::cli::{Args, RunConfig};
use tracing_subscriber::EnvFilter;

fn main() {
    install_logging();

    let args = Args::parse();
    if let Err(e) = try_main(args) {
        eprintln!("[FATAL] {e}");
        std::process::exit(1);
    }
}

fn try_main(args: Args) -> svprune::Result<()> {
    let config = RunConfig::from_args(args)?;
    svprune::run_and_emit(&config)?;
    Ok(())
}

fn install_logging() {
    let filter = EnvFilter::try_from_env("SVPRUNE_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
