//! Library module for pgview2csv
//!
//! This module exposes the command-line definition and the connection
//! resolution rules so they can be tested without spawning the binary.
//! The process entry point is in main.rs.

use anyhow::Context;
use clap::{Args, Parser};
use pgview2csv_core::{
    ConnectionDescriptor, DEFAULT_APPLICATION_NAME_SEPARATOR, ExportError, ExportRequest,
    ExportResult, QueryExecutor, ViewExporter, redact,
};
use std::fmt;
use std::path::PathBuf;

/// Environment variable that can supply `--connection-string`.
pub const CONNECTION_STRING_ENV: &str = "PGVIEW2CSV_CONNECTION_STRING";

/// CLI argument structure
#[derive(Debug, Parser)]
#[command(name = "pgview2csv")]
#[command(about = "Export a PostgreSQL view to a fully quoted CSV file")]
#[command(version)]
#[command(long_about = "
pgview2csv - export a PostgreSQL view to CSV

Runs `SELECT * FROM <view>` and writes the result as CSV: every field
quoted, comma separated, CRLF line endings, header from the column names.

CONNECTION:
  The PGHOST, PGPORT, PGUSER, PGPASSWORD and PGDATABASE variables take
  precedence when any of them is set. Otherwise --connection-string (or
  PGVIEW2CSV_CONNECTION_STRING) is used.

EXAMPLES:
  pgview2csv --file sales.csv --view reports.daily_sales
  pgview2csv -f top.csv --view v_orders --limit 100 -c \"Host=db;Database=app;Username=reader\"
")]
pub struct Cli {
    /// Verbosity flags
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Output CSV file
    #[arg(short, long, value_name = "PATH", help = "Output CSV file path")]
    pub file: PathBuf,

    /// Connection string used when no PG* variable is set
    #[arg(
        short,
        long,
        env = CONNECTION_STRING_ENV,
        hide_env_values = true,
        value_name = "CONNECTION_STRING",
        help = "Connection string, e.g. \"Host=localhost;Database=app;Username=reader\" (credentials are redacted in logs)"
    )]
    pub connection_string: Option<String>,

    /// View to export
    #[arg(
        long,
        value_name = "NAME",
        help = "View (or table) to export, optionally schema-qualified; used verbatim in the query"
    )]
    pub view: String,

    /// Row limit
    #[arg(
        long,
        value_name = "N",
        default_value_t = 0,
        help = "Maximum number of rows to export (0 exports all rows)"
    )]
    pub limit: u32,

    /// Keep an existing output file
    #[arg(long, help = "Fail instead of replacing an existing output file")]
    pub no_overwrite: bool,

    /// Application name suffix reported to the server
    #[arg(
        long,
        value_name = "NAME",
        default_value = "pgview2csv",
        help = "Name appended to the connection's application name"
    )]
    pub application_name: String,
}

/// Logging flags shared by all invocations
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, help = "Suppress all log output except errors")]
    pub quiet: bool,
}

impl Cli {
    /// Builds the export request for a resolved connection.
    ///
    /// The configured application name is appended to whatever name the
    /// connection already carries.
    pub fn export_request(&self, connection: ConnectionDescriptor) -> ExportRequest {
        let connection = if self.application_name.trim().is_empty() {
            connection
        } else {
            connection.append_application_name(
                &self.application_name,
                DEFAULT_APPLICATION_NAME_SEPARATOR,
            )
        };

        ExportRequest::new(connection, self.view.clone(), self.file.clone())
            .with_row_limit(Some(self.limit))
            .with_overwrite_existing(!self.no_overwrite)
    }
}

/// Where the connection parameters came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionSource {
    /// `PG*` environment variables
    Environment,
    /// `--connection-string` (or its environment variable)
    CommandLine,
}

impl fmt::Display for ConnectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Environment => f.write_str("PG* environment variables"),
            Self::CommandLine => f.write_str("command line"),
        }
    }
}

/// Picks the connection to use.
///
/// A descriptor built from the `PG*` variables wins when it carries any
/// field; otherwise the command-line connection string is parsed.
///
/// # Security
/// The connection string is never echoed; parse errors only describe the
/// position of the problem.
///
/// # Errors
/// Returns a configuration error when neither source yields any connection
/// parameter, or when the command-line string does not parse.
pub fn resolve_connection(
    from_env: ConnectionDescriptor,
    connection_string: Option<&str>,
) -> pgview2csv_core::Result<(ConnectionDescriptor, ConnectionSource)> {
    if !from_env.is_empty() {
        return Ok((from_env, ConnectionSource::Environment));
    }

    if let Some(text) = connection_string
        && !text.trim().is_empty()
    {
        let descriptor = text.parse::<ConnectionDescriptor>().inspect_err(|e| {
            tracing::error!(
                "Invalid connection string from {}: {}",
                ConnectionSource::CommandLine,
                e
            );
        })?;
        if !descriptor.is_empty() {
            return Ok((descriptor, ConnectionSource::CommandLine));
        }
    }

    let err = ExportError::configuration(
        "No connection information. Set PGHOST, PGPORT, PGUSER, PGPASSWORD or PGDATABASE, or pass --connection-string",
    );
    tracing::error!("{}", err);
    Err(err)
}

/// Resolves the connection and runs the export described by `cli`.
///
/// # Errors
/// Fails when no connection can be resolved or the export fails; the error
/// chain names the view.
pub async fn run<E: QueryExecutor>(
    cli: &Cli,
    from_env: ConnectionDescriptor,
    executor: E,
) -> anyhow::Result<ExportResult> {
    let (connection, source) = resolve_connection(from_env, cli.connection_string.as_deref())
        .context("Failed to resolve connection")?;
    tracing::info!("Using connection '{}' from {}", redact(&connection), source);

    let request = cli.export_request(connection);
    tracing::debug!("Export request: {}", request.describe());

    ViewExporter::new(executor)
        .export(&request)
        .await
        .with_context(|| format!("Failed to export view {}", cli.view))
}
