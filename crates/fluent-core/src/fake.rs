//! In-memory client that records statements and replays canned rows.

use std::{
  collections::{BTreeMap, VecDeque},
  sync::Mutex,
};

use crate::{client::DatabaseClient, query::Statement, value::Row};

#[derive(Debug, thiserror::Error)]
#[error("fake client failure: {0}")]
pub struct FakeError(pub String);

#[derive(Default)]
pub struct FakeClient {
  statements: Mutex<Vec<Statement>>,
  responses:  Mutex<VecDeque<Vec<Row>>>,
  columns:    Mutex<BTreeMap<String, Vec<String>>>,
  fail_on:    Mutex<Option<String>>,
}

impl FakeClient {
  /// Queue the rows returned by the next `execute`. Unqueued calls return
  /// nothing.
  pub fn respond_with(&self, rows: Vec<Row>) {
    self.responses.lock().unwrap().push_back(rows);
  }

  pub fn set_columns(&self, table: &str, columns: &[&str]) {
    self.columns.lock().unwrap().insert(
      table.to_owned(),
      columns.iter().map(|c| (*c).to_owned()).collect(),
    );
  }

  /// Fail every statement touching `table`.
  pub fn fail_on(&self, table: &str) {
    *self.fail_on.lock().unwrap() = Some(table.to_owned());
  }

  pub fn statements(&self) -> Vec<Statement> { self.statements.lock().unwrap().clone() }

  fn record(&self, statement: &Statement) -> Result<(), FakeError> {
    if self.fail_on.lock().unwrap().as_deref() == Some(statement.table()) {
      return Err(FakeError(format!("refused statement on {:?}", statement.table())));
    }
    self.statements.lock().unwrap().push(statement.clone());
    Ok(())
  }
}

impl DatabaseClient for FakeClient {
  type Error = FakeError;

  async fn connect(&self) -> Result<(), FakeError> { Ok(()) }

  async fn execute(&self, statement: &Statement) -> Result<Vec<Row>, FakeError> {
    self.record(statement)?;
    Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
  }

  async fn execute_atomic(&self, statements: &[Statement]) -> Result<(), FakeError> {
    if let Some(bad) = statements
      .iter()
      .find(|s| self.fail_on.lock().unwrap().as_deref() == Some(s.table()))
    {
      return Err(FakeError(format!("refused statement on {:?}", bad.table())));
    }
    for statement in statements {
      self.record(statement)?;
    }
    Ok(())
  }

  async fn table_columns(&self, table: &str) -> Result<Vec<String>, FakeError> {
    Ok(self.columns.lock().unwrap().get(table).cloned().unwrap_or_default())
  }
}
