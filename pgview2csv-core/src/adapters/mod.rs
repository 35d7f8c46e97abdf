//! Query execution behind a driver-neutral trait.
//!
//! The exporter only needs one capability from a database driver: run a
//! query against a connection descriptor and hand back the complete result.
//! [`QueryExecutor`] captures that contract so the export workflow can be
//! driven by PostgreSQL in production and by an in-memory executor in tests.
//!
//! # Module Structure
//! - `postgres`: sqlx-backed PostgreSQL executor (feature `postgresql`)

use crate::{ConnectionDescriptor, Result, TabularResult};
use async_trait::async_trait;

#[cfg(feature = "postgresql")]
pub mod postgres;

#[cfg(feature = "postgresql")]
pub use postgres::PostgresExecutor;

/// Runs a query and materializes its full result.
///
/// Implementations own the connection lifecycle: a connection is opened for
/// the call and released before returning, whether the query succeeded or
/// not.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Executes `sql` against the database described by `descriptor`.
    ///
    /// # Errors
    /// Returns [`crate::ExportError::QueryExecution`] when the connection
    /// cannot be opened, the query fails, or a value cannot be decoded.
    async fn fetch_all(&self, descriptor: &ConnectionDescriptor, sql: &str)
    -> Result<TabularResult>;
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for &T {
    async fn fetch_all(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
    ) -> Result<TabularResult> {
        (**self).fetch_all(descriptor, sql).await
    }
}

#[async_trait]
impl<T: QueryExecutor + ?Sized> QueryExecutor for Box<T> {
    async fn fetch_all(
        &self,
        descriptor: &ConnectionDescriptor,
        sql: &str,
    ) -> Result<TabularResult> {
        (**self).fetch_all(descriptor, sql).await
    }
}
