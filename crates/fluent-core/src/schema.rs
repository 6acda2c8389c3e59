//! Schema descriptors: declarative table-shape changes.
//!
//! A [`SchemaDescriptor`] names one table and an ordered list of
//! [`ColumnOp`]s against it. Descriptors carry no SQL; backends render them
//! in their own dialect.
//!
//! ```rust,ignore
//! let up = SchemaDescriptor::create_table("articles", |t| {
//!   t.id();
//!   t.string("title", 255).not_null();
//!   t.foreign_id("category_id").references("categories", "id");
//!   t.timestamps();
//! });
//! let down = SchemaDescriptor::drop_table("articles");
//! ```

use std::fmt;

use serde::Serialize;

use crate::value::Value;

// ─── Column metadata ─────────────────────────────────────────────────────────

/// Logical column type; backends map it onto their storage types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
  Integer,
  BigInteger,
  Real,
  Text,
  /// Bounded text; the length is advisory on backends without `VARCHAR`.
  String(u32),
  Boolean,
  Timestamp,
  Json,
}

/// Referential action for `ON DELETE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OnDelete {
  #[default]
  NoAction,
  Cascade,
  SetNull,
  Restrict,
}

/// A foreign-key constraint from `column` to `references_table(references_column)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForeignKey {
  pub column:            String,
  pub references_table:  String,
  pub references_column: String,
  pub on_delete:         OnDelete,
}

/// Full definition of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDef {
  pub name:           String,
  pub ty:             ColumnType,
  pub nullable:       bool,
  pub primary:        bool,
  pub auto_increment: bool,
  pub unique:         bool,
  pub default:        Option<Value>,
  pub references:     Option<ForeignKey>,
}

impl ColumnDef {
  pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
    Self {
      name: name.into(),
      ty,
      nullable: true,
      primary: false,
      auto_increment: false,
      unique: false,
      default: None,
      references: None,
    }
  }

  pub fn not_null(&mut self) -> &mut Self {
    self.nullable = false;
    self
  }

  pub fn nullable(&mut self) -> &mut Self {
    self.nullable = true;
    self
  }

  pub fn unique(&mut self) -> &mut Self {
    self.unique = true;
    self
  }

  pub fn primary(&mut self) -> &mut Self {
    self.primary = true;
    self.nullable = false;
    self
  }

  pub fn default(&mut self, value: impl Into<Value>) -> &mut Self {
    self.default = Some(value.into());
    self
  }

  /// Declare an inline foreign key to `table(column)`.
  pub fn references(
    &mut self,
    table: impl Into<String>,
    column: impl Into<String>,
  ) -> &mut Self {
    self.references = Some(ForeignKey {
      column:            self.name.clone(),
      references_table:  table.into(),
      references_column: column.into(),
      on_delete:         OnDelete::default(),
    });
    self
  }

  /// Set the `ON DELETE` action of a previously declared reference.
  pub fn on_delete(&mut self, action: OnDelete) -> &mut Self {
    if let Some(fk) = self.references.as_mut() {
      fk.on_delete = action;
    }
    self
  }
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// One change to a table's shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ColumnOp {
  CreateTable {
    columns:       Vec<ColumnDef>,
    if_not_exists: bool,
  },
  DropTable {
    if_exists: bool,
  },
  RenameTable {
    to: String,
  },
  CreateColumn(ColumnDef),
  DropColumn {
    column: String,
  },
  RenameColumn {
    from: String,
    to:   String,
  },
  AddForeignKey(ForeignKey),
  SetNotNull {
    column: String,
  },
}

/// Which half of a migration a descriptor belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  #[default]
  Up,
  Down,
}

impl fmt::Display for Direction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Up => f.write_str("up"),
      Self::Down => f.write_str("down"),
    }
  }
}

/// A declarative change to one table.
///
/// `Down` descriptors are trusted to be the inverse of the matching `Up`
/// ones; nothing checks or derives that.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDescriptor {
  pub table:      String,
  pub direction:  Direction,
  pub operations: Vec<ColumnOp>,
}

impl SchemaDescriptor {
  pub fn new(table: impl Into<String>) -> Self {
    Self {
      table:      table.into(),
      direction:  Direction::Up,
      operations: Vec::new(),
    }
  }

  pub fn with_direction(mut self, direction: Direction) -> Self {
    self.direction = direction;
    self
  }

  pub fn create_table(
    table: impl Into<String>,
    build: impl FnOnce(&mut TableBuilder),
  ) -> Self {
    Self::build_table(table, false, build)
  }

  pub fn create_table_if_not_exists(
    table: impl Into<String>,
    build: impl FnOnce(&mut TableBuilder),
  ) -> Self {
    Self::build_table(table, true, build)
  }

  fn build_table(
    table: impl Into<String>,
    if_not_exists: bool,
    build: impl FnOnce(&mut TableBuilder),
  ) -> Self {
    let mut builder = TableBuilder::default();
    build(&mut builder);
    let mut descriptor = Self::new(table);
    descriptor.operations.push(ColumnOp::CreateTable {
      columns: builder.columns,
      if_not_exists,
    });
    descriptor
  }

  pub fn drop_table(table: impl Into<String>) -> Self {
    let mut descriptor = Self::new(table);
    descriptor
      .operations
      .push(ColumnOp::DropTable { if_exists: false });
    descriptor
  }

  pub fn drop_table_if_exists(table: impl Into<String>) -> Self {
    let mut descriptor = Self::new(table);
    descriptor
      .operations
      .push(ColumnOp::DropTable { if_exists: true });
    descriptor
  }

  pub fn rename_table(from: impl Into<String>, to: impl Into<String>) -> Self {
    let mut descriptor = Self::new(from);
    descriptor
      .operations
      .push(ColumnOp::RenameTable { to: to.into() });
    descriptor
  }

  /// Collect column-level changes to an existing table.
  pub fn alter_table(
    table: impl Into<String>,
    build: impl FnOnce(&mut AlterBuilder),
  ) -> Self {
    let mut builder = AlterBuilder::default();
    build(&mut builder);
    let mut descriptor = Self::new(table);
    descriptor.operations = builder.finish();
    descriptor
  }
}

// ─── Builders ────────────────────────────────────────────────────────────────

/// Column collector used by [`SchemaDescriptor::create_table`].
#[derive(Debug, Default)]
pub struct TableBuilder {
  columns: Vec<ColumnDef>,
}

impl TableBuilder {
  pub fn column(
    &mut self,
    name: impl Into<String>,
    ty: ColumnType,
  ) -> &mut ColumnDef {
    self.columns.push(ColumnDef::new(name, ty));
    let last = self.columns.len() - 1;
    &mut self.columns[last]
  }

  /// Auto-incrementing integer primary key named `id`.
  pub fn id(&mut self) -> &mut ColumnDef {
    let column = self.column("id", ColumnType::Integer);
    column.primary();
    column.auto_increment = true;
    column
  }

  pub fn integer(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::Integer)
  }

  pub fn big_integer(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::BigInteger)
  }

  pub fn real(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::Real)
  }

  pub fn text(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::Text)
  }

  pub fn string(&mut self, name: impl Into<String>, len: u32) -> &mut ColumnDef {
    self.column(name, ColumnType::String(len))
  }

  pub fn boolean(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::Boolean)
  }

  pub fn timestamp(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::Timestamp)
  }

  pub fn json(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::Json)
  }

  /// Integer column meant to hold another table's key.
  pub fn foreign_id(&mut self, name: impl Into<String>) -> &mut ColumnDef {
    self.column(name, ColumnType::Integer)
  }

  /// Nullable `created_at` and `updated_at` timestamp columns.
  pub fn timestamps(&mut self) {
    self.timestamp("created_at");
    self.timestamp("updated_at");
  }
}

/// Operation collector used by [`SchemaDescriptor::alter_table`].
#[derive(Debug, Default)]
pub struct AlterBuilder {
  operations: Vec<Pending>,
}

#[derive(Debug)]
enum Pending {
  Op(ColumnOp),
  Column(ColumnDef),
}

impl AlterBuilder {
  /// Add a column; the returned definition can be refined in place.
  pub fn add_column(
    &mut self,
    name: impl Into<String>,
    ty: ColumnType,
  ) -> &mut ColumnDef {
    self.operations.push(Pending::Column(ColumnDef::new(name, ty)));
    match self.operations.last_mut() {
      Some(Pending::Column(column)) => column,
      _ => unreachable!("a column was just pushed"),
    }
  }

  pub fn drop_column(&mut self, column: impl Into<String>) -> &mut Self {
    self.operations.push(Pending::Op(ColumnOp::DropColumn {
      column: column.into(),
    }));
    self
  }

  pub fn rename_column(
    &mut self,
    from: impl Into<String>,
    to: impl Into<String>,
  ) -> &mut Self {
    self.operations.push(Pending::Op(ColumnOp::RenameColumn {
      from: from.into(),
      to:   to.into(),
    }));
    self
  }

  pub fn foreign_key(
    &mut self,
    column: impl Into<String>,
    references_table: impl Into<String>,
    references_column: impl Into<String>,
    on_delete: OnDelete,
  ) -> &mut Self {
    self.operations.push(Pending::Op(ColumnOp::AddForeignKey(ForeignKey {
      column: column.into(),
      references_table: references_table.into(),
      references_column: references_column.into(),
      on_delete,
    })));
    self
  }

  pub fn set_not_null(&mut self, column: impl Into<String>) -> &mut Self {
    self.operations.push(Pending::Op(ColumnOp::SetNotNull {
      column: column.into(),
    }));
    self
  }

  fn finish(self) -> Vec<ColumnOp> {
    self
      .operations
      .into_iter()
      .map(|pending| match pending {
        Pending::Op(op) => op,
        Pending::Column(column) => ColumnOp::CreateColumn(column),
      })
      .collect()
  }
}
