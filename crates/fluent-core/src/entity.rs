//! Entities: one row snapshot bound to its model.

use std::collections::BTreeMap;

use crate::{
  error::{Error, Result},
  model::Accessor,
  value::{Row, Value},
};

/// Lifecycle state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
  Live,
  /// The row has been deleted; further writes through this entity fail.
  Deleted,
}

/// An in-memory image of one row.
///
/// The snapshot is only replaced by the runtime after a successful write.
/// Related entities loaded through it are independent values with no link
/// back to their owner.
#[derive(Debug, Clone)]
pub struct Entity {
  table:       String,
  primary_key: String,
  row:         Row,
  state:       EntityState,
  loaded:      BTreeMap<String, Related>,
}

impl Entity {
  pub(crate) fn new(table: &str, primary_key: &str, row: Row) -> Self {
    Self {
      table: table.to_owned(),
      primary_key: primary_key.to_owned(),
      row,
      state: EntityState::Live,
      loaded: BTreeMap::new(),
    }
  }

  pub fn table(&self) -> &str { &self.table }

  pub fn row(&self) -> &Row { &self.row }

  pub fn into_row(self) -> Row { self.row }

  pub fn state(&self) -> EntityState { self.state }

  pub fn is_deleted(&self) -> bool { self.state == EntityState::Deleted }

  /// Raw value of `column`, if the snapshot has it.
  pub fn value(&self, column: &str) -> Option<&Value> { self.row.get(column) }

  /// The primary-key value.
  pub fn id(&self) -> Result<&Value> {
    self
      .row
      .get(&self.primary_key)
      .ok_or_else(|| Error::lookup(&self.table, &self.primary_key))
  }

  pub fn primary_key(&self) -> &str { &self.primary_key }

  /// Read through a typed accessor.
  pub fn get<T>(&self, accessor: &Accessor<T>) -> Result<T> {
    accessor.project(&self.row)
  }

  /// A relation cached by eager loading, if any.
  pub fn loaded(&self, relation: &str) -> Option<&Related> {
    self.loaded.get(relation)
  }

  pub(crate) fn set_loaded(&mut self, relation: &str, related: Related) {
    self.loaded.insert(relation.to_owned(), related);
  }

  pub(crate) fn replace_row(&mut self, row: Row) {
    self.row = row;
    self.loaded.clear();
  }

  pub(crate) fn mark_deleted(&mut self) {
    self.state = EntityState::Deleted;
    self.loaded.clear();
  }
}

// ─── Related ─────────────────────────────────────────────────────────────────

/// The result of resolving a relation.
#[derive(Debug, Clone)]
pub enum Related {
  /// HasOne and BelongsTo.
  One(Option<Entity>),
  /// HasMany and ManyToMany, in stored row order.
  Many(Vec<Entity>),
}

impl Related {
  pub fn one(&self) -> Option<&Entity> {
    match self {
      Self::One(entity) => entity.as_ref(),
      Self::Many(_) => None,
    }
  }

  pub fn many(&self) -> &[Entity] {
    match self {
      Self::Many(entities) => entities,
      Self::One(_) => &[],
    }
  }

  pub fn into_one(self) -> Option<Entity> {
    match self {
      Self::One(entity) => entity,
      Self::Many(_) => None,
    }
  }

  pub fn into_many(self) -> Vec<Entity> {
    match self {
      Self::Many(entities) => entities,
      Self::One(entity) => entity.into_iter().collect(),
    }
  }

  pub fn len(&self) -> usize {
    match self {
      Self::One(entity) => usize::from(entity.is_some()),
      Self::Many(entities) => entities.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
