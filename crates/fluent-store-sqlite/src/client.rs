//! [`SqliteClient`], the SQLite implementation of [`DatabaseClient`].

use std::{path::Path, slice};

use fluent_core::{DatabaseClient, Row, Statement};

use crate::{Error, Result, exec};

const CONNECTION_PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

/// A fluent database client backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteClient {
  conn: tokio_rusqlite::Connection,
}

impl SqliteClient {
  /// Open (or create) a database at `path` and apply connection settings.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let client = Self { conn };
    client.connect().await?;
    Ok(client)
  }

  /// Open an in-memory database, mostly for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let client = Self { conn };
    client.connect().await?;
    Ok(client)
  }
}

// ─── DatabaseClient impl ─────────────────────────────────────────────────────

impl DatabaseClient for SqliteClient {
  type Error = Error;

  async fn connect(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(CONNECTION_PRAGMAS)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
    let statement = statement.clone();
    self
      .conn
      .call(move |conn| {
        // Schema changes get their own transaction so a failing rebuild
        // leaves the table untouched.
        Ok(match &statement {
          Statement::Schema(_) => {
            exec::run_atomic(conn, slice::from_ref(&statement)).map(|()| Vec::new())
          }
          _ => exec::run(conn, &statement),
        })
      })
      .await?
  }

  async fn execute_atomic(&self, statements: &[Statement]) -> Result<()> {
    let statements = statements.to_vec();
    self
      .conn
      .call(move |conn| Ok(exec::run_atomic(conn, &statements)))
      .await?
  }

  async fn table_columns(&self, table: &str) -> Result<Vec<String>> {
    let table = table.to_owned();
    let columns = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let names = stmt
          .query_map([&table], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
      })
      .await?;
    Ok(columns)
  }
}
