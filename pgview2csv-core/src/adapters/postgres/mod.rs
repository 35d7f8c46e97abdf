//! PostgreSQL query executor.
//!
//! # Module Structure
//! - `connection`: descriptor to `PgConnectOptions` mapping
//! - `type_mapping`: PostgreSQL column decoding into `Value`s
//!
//! # Security Guarantees
//! - Sessions are opened read-only (`default_transaction_read_only=on`)
//! - One connection per query, closed on every path
//! - Diagnostics carry the redacted connection string only

mod connection;
mod type_mapping;

use super::QueryExecutor;
use crate::security::redact;
use crate::{ConnectionDescriptor, ExportError, Result, TabularResult};
use async_trait::async_trait;
use sqlx::{ConnectOptions, Connection, Executor, PgConnection};

/// Executes queries over a fresh `PgConnection` per call.
///
/// No pooling: an export runs exactly one query, so the connection is
/// opened, used and closed within [`QueryExecutor::fetch_all`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresExecutor;

impl PostgresExecutor {
    /// Creates an executor.
    pub fn new() -> Self {
        Self
    }

    async fn connect(descriptor: &ConnectionDescriptor, sql: &str) -> Result<PgConnection> {
        let options = connection::connect_options(descriptor)?;
        options.connect().await.map_err(|e| {
            tracing::error!(
                "Failed to connect to PostgreSQL using '{}': {}",
                redact(descriptor),
                e
            );
            ExportError::query_failed(
                format!("Failed to connect using '{}'", redact(descriptor)),
                sql,
                e,
            )
        })
    }

    async fn run(conn: &mut PgConnection, sql: &str) -> Result<TabularResult> {
        match sqlx::query_scalar::<_, String>("SHOW search_path")
            .fetch_one(&mut *conn)
            .await
        {
            Ok(search_path) => tracing::debug!("Session search_path: {}", search_path),
            Err(e) => tracing::debug!("Could not read search_path: {}", e),
        }

        tracing::debug!("Executing query: {}", sql);
        // Simple-query protocol: every column arrives in the server's text format
        let rows = conn
            .fetch_all(sqlx::raw_sql(sql))
            .await
            .map_err(|e| ExportError::query_failed("Query failed", sql, e))?;

        let mut result = TabularResult::with_capacity(rows.len());
        for row in &rows {
            result.push(type_mapping::decode_row(row, sql)?)?;
        }

        tracing::debug!("Query returned {} row(s)", result.len());
        Ok(result)
    }
}

#[async_trait]
impl QueryExecutor for PostgresExecutor {
    async fn fetch_all(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
    ) -> Result<TabularResult> {
        let mut conn = Self::connect(descriptor, sql).await?;
        let outcome = Self::run(&mut conn, sql).await;

        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close PostgreSQL connection cleanly: {}", e);
        }

        outcome
    }
}
