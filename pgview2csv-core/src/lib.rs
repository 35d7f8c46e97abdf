//! Core library for exporting PostgreSQL views to CSV.
//!
//! This crate holds everything the `pgview2csv` binary drives: connection
//! descriptors and their redaction, the in-memory query result, the CSV
//! serializer and the export workflow behind a pluggable query executor.
//!
//! # Security Guarantees
//! - Passwords live in zeroizing containers and are masked in `Debug`
//! - Connection strings are redacted before they reach logs or errors
//! - Database sessions are opened read-only
//!
//! # Example
//! ```rust,no_run
//! use pgview2csv_core::{ConnectionDescriptor, ExportRequest, PostgresExecutor, ViewExporter};
//!
//! # async fn example() -> pgview2csv_core::Result<()> {
//! let connection: ConnectionDescriptor = "Host=localhost;Database=app;Username=reporter".parse()?;
//! let request = ExportRequest::new(connection, "reports.daily_sales", "daily_sales.csv")
//!     .with_row_limit(Some(100));
//!
//! let outcome = ViewExporter::new(PostgresExecutor::new()).export(&request).await?;
//! println!("{} rows written", outcome.rows_written);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod adapters;
pub mod descriptor;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod models;
pub mod security;
pub mod serializer;

// Re-export commonly used types
#[cfg(feature = "postgresql")]
pub use adapters::PostgresExecutor;
pub use adapters::QueryExecutor;
pub use descriptor::{
    ConnectionDescriptor, DEFAULT_APPLICATION_NAME_SEPARATOR, from_env_mapping, from_process_env,
    parse_connection_string, to_connection_string,
};
pub use error::{ExportError, Result};
pub use exporter::{ExportRequest, ExportResult, ViewExporter, build_select_query};
pub use logging::init_logging;
pub use models::{Row, TabularResult, Value};
pub use security::{Password, redact, redact_connection_string};
pub use serializer::{to_csv_string, write_csv};
