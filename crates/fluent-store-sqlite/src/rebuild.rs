//! Table rebuilds for changes `ALTER TABLE` cannot make.
//!
//! Follows SQLite's twelve-step procedure: read the current shape from the
//! pragmas, create a copy with the change applied, move the rows over, drop
//! the original, rename the copy into place and re-create its indexes. The
//! caller runs this inside a transaction with foreign-key enforcement off.

use std::collections::BTreeMap;

use fluent_core::schema::ForeignKey;
use rusqlite::{Connection, OptionalExtension as _};

use crate::{
  Error, Result,
  render::{Rebuild, on_delete, quote},
};

/// A column as reported by `pragma_table_info`.
#[derive(Debug, Clone)]
struct ColumnInfo {
  name:     String,
  ty:       String,
  not_null: bool,
  default:  Option<String>,
  pk:       i64,
}

/// A foreign key as reported by `pragma_foreign_key_list`, possibly
/// spanning several columns.
#[derive(Debug, Clone, Default)]
struct ForeignKeyInfo {
  table:     String,
  from:      Vec<String>,
  to:        Vec<String>,
  on_delete: String,
}

pub fn rebuild(conn: &Connection, table: &str, change: &Rebuild) -> Result<()> {
  let create_sql: Option<String> = conn
    .query_row(
      "SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1",
      [table],
      |row| row.get(0),
    )
    .optional()?;
  let Some(create_sql) = create_sql else {
    return Err(Error::Schema(format!("table {table:?} does not exist")));
  };

  let mut columns = table_info(conn, table)?;
  let mut foreign_keys = foreign_keys(conn, table)?;
  let uniques = unique_constraints(conn, table)?;
  let indexes = index_sql(conn, table)?;

  match change {
    Rebuild::SetNotNull(column) => {
      let info = columns
        .iter_mut()
        .find(|c| c.name == *column)
        .ok_or_else(|| Error::Schema(format!("column {column:?} does not exist on {table:?}")))?;
      info.not_null = true;
    }
    Rebuild::AddForeignKey(fk) => {
      if !columns.iter().any(|c| c.name == fk.column) {
        return Err(Error::Schema(format!(
          "column {:?} does not exist on {table:?}",
          fk.column
        )));
      }
      foreign_keys.push(from_core(fk));
    }
  }

  let autoincrement = create_sql.to_ascii_uppercase().contains("AUTOINCREMENT");
  let scratch = format!("__fluent_rebuild_{table}");
  let definition = create_table(&scratch, &columns, &foreign_keys, &uniques, autoincrement);
  let column_list = columns
    .iter()
    .map(|c| quote(&c.name))
    .collect::<Vec<_>>()
    .join(", ");

  tracing::debug!(table, ?change, "rebuilding table");
  conn.execute_batch(&definition)?;
  conn.execute_batch(&format!(
    "INSERT INTO {scratch_q} ({column_list}) SELECT {column_list} FROM {table_q};
     DROP TABLE {table_q};
     ALTER TABLE {scratch_q} RENAME TO {table_q};",
    scratch_q = quote(&scratch),
    table_q = quote(table),
  ))?;
  for sql in indexes {
    conn.execute_batch(&sql)?;
  }

  let violations: i64 = conn.query_row(
    "SELECT count(*) FROM pragma_foreign_key_check(?1)",
    [table],
    |row| row.get(0),
  )?;
  if violations > 0 {
    return Err(Error::ForeignKeyViolation {
      table: table.to_owned(),
      violations,
    });
  }
  Ok(())
}

// ─── Introspection ───────────────────────────────────────────────────────────

fn table_info(conn: &Connection, table: &str) -> Result<Vec<ColumnInfo>> {
  let mut stmt = conn.prepare(
    "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
  )?;
  let columns = stmt
    .query_map([table], |row| {
      Ok(ColumnInfo {
        name:     row.get(0)?,
        ty:       row.get(1)?,
        not_null: row.get(2)?,
        default:  row.get(3)?,
        pk:       row.get(4)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(columns)
}

fn foreign_keys(conn: &Connection, table: &str) -> Result<Vec<ForeignKeyInfo>> {
  let mut stmt = conn.prepare(
    "SELECT id, \"table\", \"from\", \"to\", on_delete \
     FROM pragma_foreign_key_list(?1) ORDER BY id, seq",
  )?;
  let rows = stmt
    .query_map([table], |row| {
      Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, Option<String>>(3)?,
        row.get::<_, String>(4)?,
      ))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut grouped: BTreeMap<i64, ForeignKeyInfo> = BTreeMap::new();
  for (id, target, from, to, action) in rows {
    let entry = grouped.entry(id).or_default();
    entry.table = target;
    entry.from.push(from);
    // A missing `to` means the target's primary key.
    entry.to.extend(to);
    entry.on_delete = action;
  }
  Ok(grouped.into_values().collect())
}

/// Column lists of `UNIQUE` table and column constraints.
fn unique_constraints(conn: &Connection, table: &str) -> Result<Vec<Vec<String>>> {
  let mut stmt =
    conn.prepare("SELECT name FROM pragma_index_list(?1) WHERE origin = 'u' ORDER BY seq")?;
  let names = stmt
    .query_map([table], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  let mut info = conn.prepare("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")?;
  names
    .iter()
    .map(|index| -> Result<Vec<String>> {
      Ok(
        info
          .query_map([index], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?,
      )
    })
    .collect()
}

/// `CREATE INDEX` statements of explicitly created indexes.
fn index_sql(conn: &Connection, table: &str) -> Result<Vec<String>> {
  let mut stmt = conn.prepare(
    "SELECT sql FROM sqlite_master WHERE type = 'index' AND tbl_name = ?1 AND sql IS NOT NULL",
  )?;
  let sql = stmt
    .query_map([table], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(sql)
}

// ─── Rendering ───────────────────────────────────────────────────────────────

fn from_core(fk: &ForeignKey) -> ForeignKeyInfo {
  ForeignKeyInfo {
    table:     fk.references_table.clone(),
    from:      vec![fk.column.clone()],
    to:        vec![fk.references_column.clone()],
    on_delete: on_delete(fk.on_delete).unwrap_or("NO ACTION").to_owned(),
  }
}

fn quote_all(names: &[String]) -> String {
  names.iter().map(|n| quote(n)).collect::<Vec<_>>().join(", ")
}

fn create_table(
  name: &str,
  columns: &[ColumnInfo],
  foreign_keys: &[ForeignKeyInfo],
  uniques: &[Vec<String>],
  autoincrement: bool,
) -> String {
  let pk_columns: Vec<&ColumnInfo> = {
    let mut pk: Vec<&ColumnInfo> = columns.iter().filter(|c| c.pk > 0).collect();
    pk.sort_by_key(|c| c.pk);
    pk
  };
  let inline_pk = pk_columns.len() == 1;

  let mut parts: Vec<String> = columns
    .iter()
    .map(|column| {
      let mut sql = quote(&column.name);
      if !column.ty.is_empty() {
        sql.push(' ');
        sql.push_str(&column.ty);
      }
      if inline_pk && column.pk > 0 {
        sql.push_str(" PRIMARY KEY");
        if autoincrement && column.ty.eq_ignore_ascii_case("INTEGER") {
          sql.push_str(" AUTOINCREMENT");
        }
      }
      if column.not_null {
        sql.push_str(" NOT NULL");
      }
      if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
      }
      sql
    })
    .collect();

  if pk_columns.len() > 1 {
    let names: Vec<String> = pk_columns.iter().map(|c| c.name.clone()).collect();
    parts.push(format!("PRIMARY KEY ({})", quote_all(&names)));
  }
  for unique in uniques {
    parts.push(format!("UNIQUE ({})", quote_all(unique)));
  }
  for fk in foreign_keys {
    let mut sql = format!(
      "FOREIGN KEY ({}) REFERENCES {}",
      quote_all(&fk.from),
      quote(&fk.table)
    );
    if !fk.to.is_empty() {
      sql.push_str(&format!(" ({})", quote_all(&fk.to)));
    }
    if fk.on_delete != "NO ACTION" {
      sql.push_str(" ON DELETE ");
      sql.push_str(&fk.on_delete);
    }
    parts.push(sql);
  }

  format!("CREATE TABLE {} ({})", quote(name), parts.join(", "))
}
