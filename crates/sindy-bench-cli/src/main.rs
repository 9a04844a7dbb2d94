use anyhow::{Context, Result};
use clap::Parser;
use sindy_bench::{Harness, RunIdentity, SindyFactory};
use std::process::ExitCode;

mod cli;
mod logging;

use cli::Cli;
use logging::setup_logging;

/// Exit status when the run record itself could not be written.
const RECORD_WRITE_FAILED: u8 = 1;

fn run(cli: Cli) -> Result<u8> {
    let request = cli.into_request();
    let report = Harness::new(SindyFactory)
        .run(&request, RunIdentity::capture())
        .with_context(|| format!("failed to write run record to {}", request.out.display()))?;
    Ok(report.outcome.exit_code())
}

fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    if let Err(e) = setup_logging(cli.log_level.as_deref()) {
        eprintln!("{:#}", e);
    }

    match run(cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:?}", e);
            ExitCode::from(RECORD_WRITE_FAILED)
        }
    }
}
