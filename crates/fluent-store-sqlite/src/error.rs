//! Error type for `fluent-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  /// A schema change SQLite cannot express, or one whose target is missing.
  #[error("schema error: {0}")]
  Schema(String),

  /// A table rebuild left rows violating a foreign key.
  #[error("foreign key check failed on {table:?}: {violations} violating row(s)")]
  ForeignKeyViolation { table: String, violations: i64 },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
