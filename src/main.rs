mod cli;
mod collapse;
mod commands;
mod config;
mod error;
mod evaluate;
mod fusion;
mod lexical;
mod model;
mod scores;
mod util;
mod writer;

use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_filter);

    match commands::run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            for cause in err.chain().skip(1) {
                error!(cause = %cause, "caused by");
            }
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` overrides `--log-filter`; an unparsable directive falls back
/// to `info`.
fn init_tracing(log_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
