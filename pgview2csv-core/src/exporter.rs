//! View export workflow.
//!
//! An export runs in a fixed order:
//! 1. refuse an existing output file unless overwriting is allowed, and
//!    delete it when it is;
//! 2. build `SELECT * FROM <view>` with an optional `LIMIT`;
//! 3. fetch the complete result through a [`QueryExecutor`];
//! 4. serialize it to CSV and write the file in one call;
//! 5. confirm the file exists.
//!
//! Nothing is written when any step before the write fails.
//!
//! # Security
//! The view name is interpolated verbatim into the SQL text. It is a trusted
//! operator input and may be schema-qualified (`reports.daily`) or quoted by
//! the caller (`"Daily Report"`); it is never escaped here. Diagnostics only
//! ever contain the redacted connection string.

use crate::adapters::QueryExecutor;
use crate::security::redact;
use crate::serializer::to_csv_string;
use crate::{ConnectionDescriptor, ExportError, Result};
use std::path::{Path, PathBuf};

/// Parameters of one export.
///
/// Built once with [`ExportRequest::new`] and the `with_*` methods, then
/// read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    connection: ConnectionDescriptor,
    view_name: String,
    output_path: PathBuf,
    row_limit: Option<u32>,
    overwrite_existing: bool,
}

impl ExportRequest {
    /// Creates a request without a row limit that replaces an existing file.
    pub fn new(
        connection: ConnectionDescriptor,
        view_name: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            connection,
            view_name: view_name.into(),
            output_path: output_path.into(),
            row_limit: None,
            overwrite_existing: true,
        }
    }

    /// Caps the number of rows; `None` or `Some(0)` exports everything.
    pub fn with_row_limit(mut self, row_limit: Option<u32>) -> Self {
        self.row_limit = row_limit;
        self
    }

    /// Sets whether an existing output file may be replaced.
    pub fn with_overwrite_existing(mut self, overwrite_existing: bool) -> Self {
        self.overwrite_existing = overwrite_existing;
        self
    }

    /// Connection to export from.
    pub fn connection(&self) -> &ConnectionDescriptor {
        &self.connection
    }

    /// View (or table) name exactly as it goes into the query.
    pub fn view_name(&self) -> &str {
        &self.view_name
    }

    /// Destination file.
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Requested row limit.
    pub fn row_limit(&self) -> Option<u32> {
        self.row_limit
    }

    /// Whether an existing file is replaced.
    pub fn overwrite_existing(&self) -> bool {
        self.overwrite_existing
    }

    /// Parameter summary for diagnostics, with the connection redacted.
    pub fn describe(&self) -> String {
        format!(
            "connection='{}', view='{}', file='{}', limit={}, overwrite={}",
            redact(&self.connection),
            self.view_name,
            self.output_path.display(),
            self.row_limit
                .map_or_else(|| "none".to_string(), |n| n.to_string()),
            self.overwrite_existing
        )
    }
}

/// Outcome of a successful export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// File that was written
    pub path: PathBuf,
    /// Number of data rows, header excluded
    pub rows_written: usize,
    /// Size of the written file
    pub bytes_written: usize,
    /// Query that produced the rows
    pub query: String,
}

/// Builds the export query for a view.
///
/// `LIMIT` is appended only for a positive limit.
///
/// # Example
/// ```rust
/// use pgview2csv_core::exporter::build_select_query;
///
/// assert_eq!(build_select_query("v_sales", None), "SELECT * FROM v_sales");
/// assert_eq!(build_select_query("v_sales", Some(0)), "SELECT * FROM v_sales");
/// assert_eq!(
///     build_select_query("reports.v_sales", Some(5)),
///     "SELECT * FROM reports.v_sales LIMIT 5"
/// );
/// ```
pub fn build_select_query(view_name: &str, row_limit: Option<u32>) -> String {
    match row_limit {
        Some(limit) if limit > 0 => format!("SELECT * FROM {} LIMIT {}", view_name, limit),
        _ => format!("SELECT * FROM {}", view_name),
    }
}

/// Exports database views to CSV files.
#[derive(Debug, Clone)]
pub struct ViewExporter<E> {
    executor: E,
}

impl<E: QueryExecutor> ViewExporter<E> {
    /// Creates an exporter that runs queries through `executor`.
    pub fn new(executor: E) -> Self {
        Self { executor }
    }

    /// The underlying executor.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Exports the requested view to its output file.
    ///
    /// # Errors
    /// - [`ExportError::FileAlreadyExists`] when the file exists and
    ///   overwriting is disabled; the file is left untouched
    /// - [`ExportError::Io`] when the existing file cannot be removed or the
    ///   new one cannot be written
    /// - [`ExportError::QueryExecution`] when the query fails; no file is
    ///   written
    /// - [`ExportError::UnknownExport`] when the file is missing after a
    ///   successful write
    pub async fn export(&self, request: &ExportRequest) -> Result<ExportResult> {
        let path = request.output_path();

        self.prepare_output(request).await?;

        let query = build_select_query(request.view_name(), request.row_limit());
        tracing::info!(
            "Exporting {} to {}",
            request.view_name(),
            path.display()
        );

        let result = self
            .executor
            .fetch_all(request.connection(), &query)
            .await
            .map_err(|e| {
                tracing::error!("Export query failed: {} ({})", e, request.describe());
                match e {
                    ExportError::QueryExecution {
                        context,
                        query,
                        source,
                    } => ExportError::QueryExecution {
                        context: format!("{} [{}]", context, request.describe()),
                        query,
                        source,
                    },
                    other => other,
                }
            })?;

        let csv = to_csv_string(&result).inspect_err(|e| {
            tracing::error!("CSV serialization failed: {} ({})", e, request.describe());
        })?;

        tokio::fs::write(path, csv.as_bytes()).await.map_err(|e| {
            tracing::error!("Failed to write {}: {} ({})", path.display(), e, request.describe());
            ExportError::io(format!("Failed to write to {}", path.display()), e)
        })?;

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::error!(
                "Output file {} missing after write ({})",
                path.display(),
                request.describe()
            );
            return Err(ExportError::UnknownExport {
                view_name: request.view_name().to_string(),
                path: path.to_path_buf(),
            });
        }

        tracing::debug!(
            "Wrote {} row(s), {} byte(s) to {}",
            result.len(),
            csv.len(),
            path.display()
        );

        Ok(ExportResult {
            path: path.to_path_buf(),
            rows_written: result.len(),
            bytes_written: csv.len(),
            query,
        })
    }

    async fn prepare_output(&self, request: &ExportRequest) -> Result<()> {
        let path = request.output_path();
        let exists = tokio::fs::try_exists(path).await.map_err(|e| {
            ExportError::io(
                format!("Failed to check whether {} exists", path.display()),
                e,
            )
        })?;

        if !exists {
            return Ok(());
        }

        if !request.overwrite_existing() {
            tracing::error!(
                "Output file {} already exists ({})",
                path.display(),
                request.describe()
            );
            return Err(ExportError::FileAlreadyExists {
                path: path.to_path_buf(),
            });
        }

        tracing::debug!("Removing existing output file {}", path.display());
        tokio::fs::remove_file(path).await.map_err(|e| {
            tracing::error!(
                "Failed to remove {}: {} ({})",
                path.display(),
                e,
                request.describe()
            );
            ExportError::io(format!("Failed to remove {}", path.display()), e)
        })
    }
}
