//! Error types for `fluent-core`.

use std::fmt;

use thiserror::Error;

use crate::{hooks::LifecycleEvent, schema::Direction, value::Value};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  /// A model, relation or migration is missing, duplicated or ambiguous.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// An `*_or_fail` finder matched nothing.
  #[error("no row in {table:?} where {column} = {value}")]
  NotFound {
    table:  String,
    column: String,
    value:  Value,
  },

  /// A column referenced by a relation or a write is absent from the schema.
  #[error("column {column:?} does not exist on {table:?}")]
  Lookup { table: String, column: String },

  /// A migration statement failed. Migrations listed in `completed` finished
  /// in the same invocation and stay committed.
  #[error("migration {name} failed while running {direction}: {source}")]
  MigrationFailed {
    name:      String,
    direction: Direction,
    completed: Vec<String>,
    #[source]
    source:    BoxError,
  },

  /// Another `run`, `rollback` or `fresh` holds this migrator.
  #[error("another migration operation is already in progress")]
  MigrationInProgress,

  #[error("{event} hook failed: {source}")]
  Hook {
    event:  LifecycleEvent,
    #[source]
    source: BoxError,
  },

  /// A value could not be projected into the requested Rust type.
  #[error("cannot decode column {column:?} from {value}")]
  Decode { column: String, value: Value },

  /// Write attempted through an entity that has already been deleted.
  #[error("entity of {0:?} was deleted")]
  Deleted(String),

  #[error("malformed ledger row: {0}")]
  Ledger(String),

  #[error("database error: {0}")]
  Database(#[source] BoxError),
}

impl Error {
  pub(crate) fn database<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Database(Box::new(err))
  }

  pub(crate) fn lookup(table: &str, column: &str) -> Self {
    Self::Lookup {
      table:  table.to_owned(),
      column: column.to_owned(),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── Non-fatal diagnostics ───────────────────────────────────────────────────

/// A HasOne relation matched more than one row. The first match is used;
/// this is only reported through `tracing`.
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityWarning {
  pub relation: String,
  pub table:    String,
  pub matches:  usize,
}

impl fmt::Display for IntegrityWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "has-one relation {:?} matched {} rows in {:?}; using the first",
      self.relation, self.matches, self.table
    )
  }
}
