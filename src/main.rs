//! driftcheck CLI entry point.

use clap::Parser;
use driftcheck::cli::{self, Cli, Commands, EXIT_ERROR};
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `driftcheck=debug`).
const LOG_ENV: &str = "DRIFTCHECK_LOG";

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match &cli.command {
        Commands::Check(args) => cli::run_check(args).await,
        Commands::Extract(args) => cli::run_extract(args),
        Commands::Init(args) => cli::run_init(args),
    };

    let exit_code = match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
