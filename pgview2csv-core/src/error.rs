//! Error types for view exports.
//!
//! Every variant is built so that its `Display` output is safe to print:
//! connection details only ever appear in their redacted form and passwords
//! are never part of a message.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for pgview2csv operations.
///
/// # Security
/// Connection strings carried for diagnostics are always redacted before
/// they are stored in an error.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Missing or invalid connection configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Target file exists and overwriting was not requested
    #[error("File {} already exists.", .path.display())]
    FileAlreadyExists { path: PathBuf },

    /// File system operation failed
    #[error("I/O operation failed: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// Connection or query failure reported by the database driver
    #[error("Query execution failed: {context} (sql: {query})")]
    QueryExecution {
        context: String,
        query: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Export finished without a more specific error but its postcondition does not hold
    #[error("Unknown error while generating CSV output for {view_name} to {}.", .path.display())]
    UnknownExport { view_name: String, path: PathBuf },

    /// CSV encoding failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: csv::Error,
    },

    /// A row does not share the column layout of the first row
    #[error("Row {row_index} has columns [{found}] but the result started with [{expected}]")]
    InconsistentColumns {
        row_index: usize,
        expected: String,
        found: String,
    },
}

/// Convenience type alias for Results with ExportError
pub type Result<T> = std::result::Result<T, ExportError>;

impl ExportError {
    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates an I/O error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Creates a query execution error carrying the driver error and the SQL text
    pub fn query_failed<E>(context: impl Into<String>, query: impl Into<String>, error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::QueryExecution {
            context: context.into(),
            query: query.into(),
            source: error.into(),
        }
    }

    /// Creates a CSV serialization error
    pub fn serialization(context: impl Into<String>, source: csv::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }
}
