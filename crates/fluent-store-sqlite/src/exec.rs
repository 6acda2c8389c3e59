//! Synchronous statement execution, run inside `tokio_rusqlite` closures.

use fluent_core::{Row, Statement, Value, schema::SchemaDescriptor};
use rusqlite::{Connection, types::ValueRef};

use crate::{
  Result,
  rebuild,
  render::{self, Rendered, SchemaStep},
};

/// Run one statement on `conn` and collect the rows it returns.
pub fn run(conn: &Connection, statement: &Statement) -> Result<Vec<Row>> {
  match statement {
    Statement::Schema(descriptor) => {
      apply_schema(conn, descriptor)?;
      Ok(Vec::new())
    }
    Statement::Select(query) => query_rows(conn, &render::select(query)),
    Statement::Insert { table, values } => query_rows(conn, &render::insert(table, values)),
    Statement::Update { table, values, conditions } => {
      query_rows(conn, &render::update(table, values, conditions))
    }
    Statement::Delete { table, conditions } => {
      query_rows(conn, &render::delete(table, conditions))
    }
  }
}

/// Whether running `statements` requires foreign-key enforcement to be off.
pub fn needs_rebuild(statements: &[Statement]) -> bool {
  statements.iter().any(|statement| match statement {
    Statement::Schema(descriptor) => render::needs_rebuild(descriptor),
    _ => false,
  })
}

/// Run `statements` in one transaction.
///
/// `PRAGMA foreign_keys` is a no-op inside a transaction, so it is switched
/// off before `BEGIN` when a rebuild is involved and restored after the
/// transaction ends, whatever its outcome.
pub fn run_atomic(conn: &mut Connection, statements: &[Statement]) -> Result<()> {
  let suspend = needs_rebuild(statements);
  if suspend {
    conn.pragma_update(None, "foreign_keys", false)?;
  }

  let outcome = run_in_transaction(conn, statements);

  if suspend {
    conn.pragma_update(None, "foreign_keys", true)?;
  }
  outcome
}

fn run_in_transaction(conn: &mut Connection, statements: &[Statement]) -> Result<()> {
  let tx = conn.transaction()?;
  for statement in statements {
    tracing::debug!(table = statement.table(), "executing statement");
    run(&tx, statement)?;
  }
  tx.commit()?;
  Ok(())
}

fn apply_schema(conn: &Connection, descriptor: &SchemaDescriptor) -> Result<()> {
  for step in render::schema_steps(descriptor) {
    match step {
      SchemaStep::Sql(sql) => {
        tracing::debug!(%sql, "schema");
        conn.execute_batch(&sql)?;
      }
      SchemaStep::Rebuild { table, change } => rebuild::rebuild(conn, &table, &change)?,
    }
  }
  Ok(())
}

fn query_rows(conn: &Connection, rendered: &Rendered) -> Result<Vec<Row>> {
  let mut stmt = conn.prepare(&rendered.sql)?;
  let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

  let mut rows = stmt.query(rusqlite::params_from_iter(rendered.params.iter()))?;
  let mut out = Vec::new();
  while let Some(row) = rows.next()? {
    let mut decoded = Row::new();
    for (index, name) in names.iter().enumerate() {
      decoded.insert(name.clone(), decode(row.get_ref(index)?));
    }
    out.push(decoded);
  }
  Ok(out)
}

/// Storage value to core value. Booleans and timestamps come back as their
/// storage encoding; `FromValue` undoes it on typed reads.
fn decode(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::Integer(i),
    ValueRef::Real(r) => Value::Real(r),
    ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
      Value::Text(String::from_utf8_lossy(bytes).into_owned())
    }
  }
}
