//! Migrations as named pairs of `up` / `down` schema descriptors.
//!
//! `down` is authored by hand and trusted to undo `up`; nothing here derives
//! or checks it. Migrations are applied in the order they are handed to the
//! [`Migrator`](crate::ledger::Migrator), never by name.

use chrono::{DateTime, Utc};

use crate::schema::{Direction, SchemaDescriptor};

/// A single schema migration.
pub trait Migration: Send + Sync {
  /// Unique name recorded in the ledger.
  fn name(&self) -> &str;

  fn up(&self) -> Vec<SchemaDescriptor>;

  fn down(&self) -> Vec<SchemaDescriptor>;

  /// The descriptors for `direction`, tagged with it.
  fn descriptors(&self, direction: Direction) -> Vec<SchemaDescriptor> {
    let descriptors = match direction {
      Direction::Up => self.up(),
      Direction::Down => self.down(),
    };
    descriptors
      .into_iter()
      .map(|d| d.with_direction(direction))
      .collect()
  }
}

/// A migration assembled from descriptor lists.
///
/// ```rust,ignore
/// SchemaMigration::new(conventional_name("categories", at))
///   .up(SchemaDescriptor::create_table("categories", |t| {
///     t.id();
///     t.string("name", 120).not_null();
///   }))
///   .down(SchemaDescriptor::drop_table("categories"));
/// ```
#[derive(Debug, Clone)]
pub struct SchemaMigration {
  name: String,
  up:   Vec<SchemaDescriptor>,
  down: Vec<SchemaDescriptor>,
}

impl SchemaMigration {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      up:   Vec::new(),
      down: Vec::new(),
    }
  }

  pub fn up(mut self, descriptor: SchemaDescriptor) -> Self {
    self.up.push(descriptor);
    self
  }

  pub fn down(mut self, descriptor: SchemaDescriptor) -> Self {
    self.down.push(descriptor);
    self
  }

  pub fn boxed(self) -> Box<dyn Migration> { Box::new(self) }
}

impl Migration for SchemaMigration {
  fn name(&self) -> &str { &self.name }

  fn up(&self) -> Vec<SchemaDescriptor> { self.up.clone() }

  fn down(&self) -> Vec<SchemaDescriptor> { self.down.clone() }
}

/// `{TableName}{milliseconds}`, e.g. `ArticleTag1700000000000` for
/// `article_tag`.
pub fn conventional_name(table: &str, at: DateTime<Utc>) -> String {
  let mut name: String = table
    .split(['_', '-', ' '])
    .filter(|word| !word.is_empty())
    .map(|word| {
      let mut chars = word.chars();
      chars
        .next()
        .map(|first| first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect())
        .unwrap_or_default()
    })
    .collect::<Vec<String>>()
    .concat();
  name.push_str(&at.timestamp_millis().to_string());
  name
}
