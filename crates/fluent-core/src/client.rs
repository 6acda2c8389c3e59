//! The `DatabaseClient` trait, the only way the core reaches a database.
//!
//! The trait is implemented by backends (e.g. `fluent-store-sqlite`). The
//! ledger, resolver and runtime depend on this abstraction, never on a
//! concrete driver.

use std::future::Future;

use crate::{query::Statement, value::Row};

/// Abstraction over a SQL database connection.
///
/// All methods return `Send` futures so clients can be shared across tasks of
/// a multi-threaded runtime.
pub trait DatabaseClient: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Establish the connection and apply connection-level settings.
  /// Idempotent.
  fn connect(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Run one statement and return its rows in the order the database
  /// produced them. Schema statements return no rows.
  fn execute<'a>(
    &'a self,
    statement: &'a Statement,
  ) -> impl Future<Output = Result<Vec<Row>, Self::Error>> + Send + 'a;

  /// Run `statements` as one unit: either all of them take effect or none.
  fn execute_atomic<'a>(
    &'a self,
    statements: &'a [Statement],
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Column names of `table` in declaration order; empty when the table
  /// does not exist.
  fn table_columns<'a>(
    &'a self,
    table: &'a str,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + 'a;
}
