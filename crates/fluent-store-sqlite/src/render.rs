//! Rendering of structured statements to SQLite SQL.
//!
//! Every identifier is double-quoted and every value is bound as a positional
//! parameter; only `DEFAULT` clauses inline literals. Booleans are stored as
//! `0` / `1` and timestamps as RFC 3339 text.

use fluent_core::{
  Condition, Query, Value,
  query::Order,
  schema::{ColumnDef, ColumnOp, ColumnType, ForeignKey, OnDelete, SchemaDescriptor},
};
use rusqlite::types::Value as SqlValue;

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
  pub sql:    String,
  pub params: Vec<SqlValue>,
}

// ─── Identifiers and values ──────────────────────────────────────────────────

pub fn quote(ident: &str) -> String { format!("\"{}\"", ident.replace('"', "\"\"")) }

pub fn param(value: &Value) -> SqlValue {
  match value {
    Value::Null => SqlValue::Null,
    Value::Integer(i) => SqlValue::Integer(*i),
    Value::Real(r) => SqlValue::Real(*r),
    Value::Text(s) => SqlValue::Text(s.clone()),
    Value::Boolean(b) => SqlValue::Integer(i64::from(*b)),
    Value::Timestamp(dt) => SqlValue::Text(dt.to_rfc3339()),
  }
}

fn literal(value: &Value) -> String {
  match value {
    Value::Null => "NULL".to_owned(),
    Value::Integer(i) => i.to_string(),
    Value::Real(r) => r.to_string(),
    Value::Text(s) => format!("'{}'", s.replace('\'', "''")),
    Value::Boolean(b) => i64::from(*b).to_string(),
    Value::Timestamp(dt) => format!("'{}'", dt.to_rfc3339()),
  }
}

// ─── DDL ─────────────────────────────────────────────────────────────────────

pub fn column_type(ty: ColumnType) -> String {
  match ty {
    ColumnType::Integer | ColumnType::BigInteger => "INTEGER".to_owned(),
    ColumnType::Real => "REAL".to_owned(),
    ColumnType::Text | ColumnType::Json => "TEXT".to_owned(),
    ColumnType::String(len) => format!("VARCHAR({len})"),
    ColumnType::Boolean => "BOOLEAN".to_owned(),
    ColumnType::Timestamp => "TIMESTAMP".to_owned(),
  }
}

pub fn on_delete(action: OnDelete) -> Option<&'static str> {
  match action {
    OnDelete::NoAction => None,
    OnDelete::Cascade => Some("CASCADE"),
    OnDelete::SetNull => Some("SET NULL"),
    OnDelete::Restrict => Some("RESTRICT"),
  }
}

fn references(fk: &ForeignKey) -> String {
  let mut sql = format!(
    "REFERENCES {} ({})",
    quote(&fk.references_table),
    quote(&fk.references_column)
  );
  if let Some(action) = on_delete(fk.on_delete) {
    sql.push_str(" ON DELETE ");
    sql.push_str(action);
  }
  sql
}

fn column_def(column: &ColumnDef) -> String {
  let mut sql = format!("{} {}", quote(&column.name), column_type(column.ty));
  if column.primary {
    sql.push_str(" PRIMARY KEY");
    if column.auto_increment {
      sql.push_str(" AUTOINCREMENT");
    }
  } else if !column.nullable {
    sql.push_str(" NOT NULL");
  }
  if column.unique && !column.primary {
    sql.push_str(" UNIQUE");
  }
  if let Some(default) = &column.default {
    sql.push_str(" DEFAULT ");
    sql.push_str(&literal(default));
  }
  if let Some(fk) = &column.references {
    sql.push(' ');
    sql.push_str(&references(fk));
  }
  sql
}

/// A change SQLite's `ALTER TABLE` cannot make in place.
#[derive(Debug, Clone, PartialEq)]
pub enum Rebuild {
  AddForeignKey(ForeignKey),
  SetNotNull(String),
}

/// One executable step of a schema descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaStep {
  Sql(String),
  Rebuild { table: String, change: Rebuild },
}

pub fn needs_rebuild(descriptor: &SchemaDescriptor) -> bool {
  descriptor
    .operations
    .iter()
    .any(|op| matches!(op, ColumnOp::AddForeignKey(_) | ColumnOp::SetNotNull { .. }))
}

/// Steps for `descriptor`, in operation order. A `RenameTable` moves later
/// operations onto the new name.
pub fn schema_steps(descriptor: &SchemaDescriptor) -> Vec<SchemaStep> {
  let mut table = descriptor.table.clone();
  let mut steps = Vec::with_capacity(descriptor.operations.len());

  for op in &descriptor.operations {
    let step = match op {
      ColumnOp::CreateTable { columns, if_not_exists } => {
        let columns: Vec<String> = columns.iter().map(column_def).collect();
        SchemaStep::Sql(format!(
          "CREATE TABLE {}{} ({})",
          if *if_not_exists { "IF NOT EXISTS " } else { "" },
          quote(&table),
          columns.join(", ")
        ))
      }
      ColumnOp::DropTable { if_exists } => SchemaStep::Sql(format!(
        "DROP TABLE {}{}",
        if *if_exists { "IF EXISTS " } else { "" },
        quote(&table)
      )),
      ColumnOp::RenameTable { to } => {
        let sql = format!("ALTER TABLE {} RENAME TO {}", quote(&table), quote(to));
        table = to.clone();
        SchemaStep::Sql(sql)
      }
      ColumnOp::CreateColumn(column) => SchemaStep::Sql(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote(&table),
        column_def(column)
      )),
      ColumnOp::DropColumn { column } => SchemaStep::Sql(format!(
        "ALTER TABLE {} DROP COLUMN {}",
        quote(&table),
        quote(column)
      )),
      ColumnOp::RenameColumn { from, to } => SchemaStep::Sql(format!(
        "ALTER TABLE {} RENAME COLUMN {} TO {}",
        quote(&table),
        quote(from),
        quote(to)
      )),
      ColumnOp::AddForeignKey(fk) => SchemaStep::Rebuild {
        table:  table.clone(),
        change: Rebuild::AddForeignKey(fk.clone()),
      },
      ColumnOp::SetNotNull { column } => SchemaStep::Rebuild {
        table:  table.clone(),
        change: Rebuild::SetNotNull(column.clone()),
      },
    };
    steps.push(step);
  }
  steps
}

// ─── DML ─────────────────────────────────────────────────────────────────────

fn where_clause(conditions: &[Condition], params: &mut Vec<SqlValue>) -> String {
  if conditions.is_empty() {
    return String::new();
  }
  let parts: Vec<String> = conditions
    .iter()
    .map(|condition| match condition {
      Condition::Eq(column, Value::Null) => format!("{} IS NULL", quote(column)),
      Condition::Eq(column, value) => {
        params.push(param(value));
        format!("{} = ?", quote(column))
      }
      Condition::In(_, values) if values.is_empty() => "0".to_owned(),
      Condition::In(column, values) => {
        params.extend(values.iter().map(param));
        let marks = vec!["?"; values.len()].join(", ");
        format!("{} IN ({marks})", quote(column))
      }
    })
    .collect();
  format!(" WHERE {}", parts.join(" AND "))
}

pub fn select(query: &Query) -> Rendered {
  let mut params = Vec::new();
  let mut sql = format!("SELECT * FROM {}", quote(&query.table));
  sql.push_str(&where_clause(&query.conditions, &mut params));

  if !query.order_by.is_empty() {
    let order: Vec<String> = query
      .order_by
      .iter()
      .map(|(column, order)| {
        let dir = match order {
          Order::Asc => "ASC",
          Order::Desc => "DESC",
        };
        format!("{} {dir}", quote(column))
      })
      .collect();
    sql.push_str(" ORDER BY ");
    sql.push_str(&order.join(", "));
  }
  if let Some(limit) = query.limit {
    sql.push_str(&format!(" LIMIT {limit}"));
  }
  Rendered { sql, params }
}

pub fn insert(table: &str, values: &fluent_core::Row) -> Rendered {
  if values.is_empty() {
    return Rendered {
      sql:    format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quote(table)),
      params: Vec::new(),
    };
  }
  let columns: Vec<String> = values.keys().map(|c| quote(c)).collect();
  let marks = vec!["?"; values.len()].join(", ");
  Rendered {
    sql:    format!(
      "INSERT INTO {} ({}) VALUES ({marks}) RETURNING *",
      quote(table),
      columns.join(", ")
    ),
    params: values.values().map(param).collect(),
  }
}

/// An update without assignments selects the matched rows instead.
pub fn update(table: &str, values: &fluent_core::Row, conditions: &[Condition]) -> Rendered {
  if values.is_empty() {
    let mut query = Query::table(table);
    query.conditions = conditions.to_vec();
    return select(&query);
  }
  let mut params: Vec<SqlValue> = values.values().map(param).collect();
  let assignments: Vec<String> = values.keys().map(|c| format!("{} = ?", quote(c))).collect();
  let mut sql = format!("UPDATE {} SET {}", quote(table), assignments.join(", "));
  sql.push_str(&where_clause(conditions, &mut params));
  sql.push_str(" RETURNING *");
  Rendered { sql, params }
}

pub fn delete(table: &str, conditions: &[Condition]) -> Rendered {
  let mut params = Vec::new();
  let mut sql = format!("DELETE FROM {}", quote(table));
  sql.push_str(&where_clause(conditions, &mut params));
  sql.push_str(" RETURNING *");
  Rendered { sql, params }
}
