//! Async patterns CLI
//!
//! Entry point for the `async-patterns` binary. Parses CLI arguments and
//! delegates to the Runner.

use clap::Parser;
use patterns_cli::{Cli, CliResult, Runner};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Logs go to stderr so JSON output stays parseable.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    match execute(&cli) {
        Ok(output) => {
            print!("{output}");
            ExitCode::SUCCESS
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn execute(cli: &Cli) -> CliResult<String> {
    let config = cli.load_config()?;
    let runner = Runner::new(config);
    let reports = runner.run_all(&cli.strategy.selections())?;
    Runner::render(&reports, cli.format)
}
