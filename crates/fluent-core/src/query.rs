//! Structured statements handed to a [`DatabaseClient`](crate::client::DatabaseClient).
//!
//! Predicates are limited to what relation loading and the finders need:
//! conjunctions of equality and membership tests.

use crate::{
  schema::SchemaDescriptor,
  value::{Row, Value},
};

/// A single predicate; a statement's conditions are AND-ed together.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  Eq(String, Value),
  /// Always false when the list is empty.
  In(String, Vec<Value>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
  Asc,
  Desc,
}

/// A `SELECT *` over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
  pub table:      String,
  pub conditions: Vec<Condition>,
  pub order_by:   Vec<(String, Order)>,
  pub limit:      Option<usize>,
}

impl Query {
  pub fn table(table: impl Into<String>) -> Self {
    Self {
      table:      table.into(),
      conditions: Vec::new(),
      order_by:   Vec::new(),
      limit:      None,
    }
  }

  pub fn where_eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
    self.conditions.push(Condition::Eq(column.into(), value.into()));
    self
  }

  pub fn where_in(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
    self.conditions.push(Condition::In(column.into(), values));
    self
  }

  pub fn order_by(mut self, column: impl Into<String>, order: Order) -> Self {
    self.order_by.push((column.into(), order));
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }
}

/// Everything the core ever asks a backend to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
  Schema(SchemaDescriptor),
  Select(Query),
  /// Returns the inserted row.
  Insert { table: String, values: Row },
  /// Returns the updated rows.
  Update {
    table:      String,
    values:     Row,
    conditions: Vec<Condition>,
  },
  /// Returns the deleted rows.
  Delete {
    table:      String,
    conditions: Vec<Condition>,
  },
}

impl Statement {
  /// The table this statement touches.
  pub fn table(&self) -> &str {
    match self {
      Self::Schema(descriptor) => &descriptor.table,
      Self::Select(query) => &query.table,
      Self::Insert { table, .. }
      | Self::Update { table, .. }
      | Self::Delete { table, .. } => table,
    }
  }
}
