//! PostgreSQL view to CSV export tool.
//!
//! Reads a view with `SELECT *` and writes the result to a fully quoted CSV
//! file.
//!
//! # Security Guarantees
//! - Read-only database sessions
//! - Connection strings are redacted in every log line and error
//!
//! Exit status is 0 after a successful export and 1 otherwise, including
//! when help or version information was requested.

use clap::Parser;
use pgview2csv::{Cli, run};
use pgview2csv_core::{PostgresExecutor, from_process_env, init_logging};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{error, info};

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version output also land here and count as failures
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("pgview2csv v{}", env!("CARGO_PKG_VERSION"));
    let started = Instant::now();

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            eprintln!("Error: Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let outcome = runtime.block_on(async {
        let from_env = from_process_env()?;
        run(&cli, from_env, PostgresExecutor::new()).await
    });

    match outcome {
        Ok(result) => {
            info!(
                "Exported {} row(s) in {:.2?}",
                result.rows_written,
                started.elapsed()
            );
            println!(
                "CSV output for {} successfully written to {}.",
                cli.view,
                result.path.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Export failed after {:.2?}: {:#}", started.elapsed(), e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
