//! Model definitions, the model registry and typed accessors.
//!
//! A [`ModelDefinition`] declares a table's primary key, typed properties,
//! relations and hooks. Definitions are handed to a [`Registry`] once at
//! startup; the registry checks them against each other and is immutable
//! afterwards.

use std::{fmt, sync::Arc};

use crate::{
  entity::Entity,
  error::{Error, Result},
  hooks::{HookResult, Hooks},
  query::Query,
  relation::RelationSpec,
  schema::ColumnType,
  value::{FromValue, Row},
};

pub const CREATED_AT: &str = "created_at";
pub const UPDATED_AT: &str = "updated_at";

// ─── Definition ──────────────────────────────────────────────────────────────

/// A declared, typed column of a model.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
  pub name: String,
  pub ty:   ColumnType,
}

/// Everything the runtime knows about one table.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
  table:            String,
  primary_key:      String,
  primary_key_type: ColumnType,
  properties:       Vec<Property>,
  relations:        Vec<RelationSpec>,
  timestamps:       bool,
  hooks:            Hooks,
}

impl ModelDefinition {
  /// A model over `table` with an integer primary key named `id`.
  pub fn new(table: impl Into<String>) -> Self {
    Self {
      table:            table.into(),
      primary_key:      "id".to_owned(),
      primary_key_type: ColumnType::Integer,
      properties:       Vec::new(),
      relations:        Vec::new(),
      timestamps:       false,
      hooks:            Hooks::default(),
    }
  }

  pub fn primary_key(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
    self.primary_key = name.into();
    self.primary_key_type = ty;
    self
  }

  pub fn property(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
    self.properties.push(Property { name: name.into(), ty });
    self
  }

  /// Maintain `created_at` / `updated_at` on writes.
  pub fn timestamps(mut self) -> Self {
    self.timestamps = true;
    self
  }

  pub fn relation(mut self, relation: RelationSpec) -> Self {
    self.relations.push(relation);
    self
  }

  pub fn has_one(self, name: impl Into<String>, target: impl Into<String>) -> Self {
    self.relation(RelationSpec::has_one(name, target))
  }

  pub fn has_many(self, name: impl Into<String>, target: impl Into<String>) -> Self {
    self.relation(RelationSpec::has_many(name, target))
  }

  pub fn belongs_to(self, name: impl Into<String>, target: impl Into<String>) -> Self {
    self.relation(RelationSpec::belongs_to(name, target))
  }

  pub fn many_to_many(
    self,
    name: impl Into<String>,
    target: impl Into<String>,
  ) -> Self {
    self.relation(RelationSpec::many_to_many(name, target))
  }

  // ── Hook registration ─────────────────────────────────────────────────

  pub fn before_fetch<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Query) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.before_fetch.push(Arc::new(hook));
    self
  }

  pub fn after_fetch<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Vec<Entity>) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.after_fetch.push(Arc::new(hook));
    self
  }

  pub fn before_find<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Query) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.before_find.push(Arc::new(hook));
    self
  }

  pub fn after_find<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Entity) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.after_find.push(Arc::new(hook));
    self
  }

  pub fn before_create<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Row) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.before_create.push(Arc::new(hook));
    self
  }

  pub fn after_create<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Entity) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.after_create.push(Arc::new(hook));
    self
  }

  pub fn before_save<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Row) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.before_save.push(Arc::new(hook));
    self
  }

  pub fn after_save<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Entity) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.after_save.push(Arc::new(hook));
    self
  }

  /// Runs before a delete on a copy of the row; the delete itself always
  /// targets the entity's snapshot key.
  pub fn before_delete<F>(mut self, hook: F) -> Self
  where
    F: Fn(&mut Row) -> HookResult + Send + Sync + 'static,
  {
    self.hooks.before_delete.push(Arc::new(hook));
    self
  }

  // ── Reads ─────────────────────────────────────────────────────────────

  pub fn table(&self) -> &str { &self.table }

  pub fn primary_key_name(&self) -> &str { &self.primary_key }

  pub fn properties(&self) -> &[Property] { &self.properties }

  pub fn relations(&self) -> &[RelationSpec] { &self.relations }

  pub fn hooks(&self) -> &Hooks { &self.hooks }

  pub fn has_timestamps(&self) -> bool { self.timestamps }

  /// Declared type of `column`: the primary key, a property, or one of the
  /// timestamp columns.
  pub fn column_type(&self, column: &str) -> Option<ColumnType> {
    if column == self.primary_key {
      return Some(self.primary_key_type);
    }
    if let Some(property) = self.properties.iter().find(|p| p.name == column) {
      return Some(property.ty);
    }
    if self.timestamps && (column == CREATED_AT || column == UPDATED_AT) {
      return Some(ColumnType::Timestamp);
    }
    None
  }

  pub fn has_column(&self, column: &str) -> bool { self.column_type(column).is_some() }

  /// `Ok` when `column` is declared, otherwise a lookup error.
  pub(crate) fn require_column(&self, column: &str) -> Result<()> {
    if self.has_column(column) {
      Ok(())
    } else {
      Err(Error::lookup(&self.table, column))
    }
  }

  pub fn relation_named(&self, name: &str) -> Result<&RelationSpec> {
    self
      .relations
      .iter()
      .find(|r| r.name == name)
      .ok_or_else(|| {
        Error::Configuration(format!(
          "model {:?} declares no relation named {name:?}",
          self.table
        ))
      })
  }

  /// Build a typed accessor for a declared column.
  ///
  /// The column's declared type is checked against `T` here, once; reading
  /// through the accessor later only converts the value.
  pub fn accessor<T>(&self, column: &str) -> Result<Accessor<T>>
  where
    T: FromValue + 'static,
  {
    let ty = self
      .column_type(column)
      .ok_or_else(|| Error::lookup(&self.table, column))?;
    if !T::accepts(ty) {
      return Err(Error::Configuration(format!(
        "column {:?}.{column:?} is declared as {ty:?}, which cannot be read as {}",
        self.table,
        std::any::type_name::<T>()
      )));
    }

    let table = self.table.clone();
    let name = column.to_owned();
    Ok(Accessor::derived(column, move |row: &Row| {
      let value = row.get(&name).ok_or_else(|| Error::lookup(&table, &name))?;
      T::from_value(value).ok_or_else(|| Error::Decode {
        column: name.clone(),
        value:  value.clone(),
      })
    }))
  }

  fn validate(&self) -> Result<()> {
    if self.table.is_empty() {
      return Err(Error::Configuration("model with an empty table name".into()));
    }
    if self.primary_key.is_empty() {
      return Err(Error::Configuration(format!(
        "model {:?} has an empty primary key",
        self.table
      )));
    }
    for (i, property) in self.properties.iter().enumerate() {
      let duplicate = property.name == self.primary_key
        || self.properties[..i].iter().any(|p| p.name == property.name);
      if duplicate {
        return Err(Error::Configuration(format!(
          "model {:?} declares column {:?} twice",
          self.table, property.name
        )));
      }
    }
    for (i, relation) in self.relations.iter().enumerate() {
      if self.relations[..i].iter().any(|r| r.name == relation.name) {
        return Err(Error::Configuration(format!(
          "model {:?} declares relation {:?} twice",
          self.table, relation.name
        )));
      }
    }
    Ok(())
  }
}

// ─── Registry ────────────────────────────────────────────────────────────────

/// The ordered set of model definitions an application registers at startup.
#[derive(Debug, Clone)]
pub struct Registry {
  models: Vec<ModelDefinition>,
}

impl Registry {
  /// Validate and register `models`.
  ///
  /// Fails with a configuration error on duplicate tables, duplicate columns
  /// or relations within a model, and relations whose target is not
  /// registered.
  pub fn new(models: Vec<ModelDefinition>) -> Result<Self> {
    for (i, model) in models.iter().enumerate() {
      model.validate()?;
      if models[..i].iter().any(|m| m.table == model.table) {
        return Err(Error::Configuration(format!(
          "model {:?} is registered twice",
          model.table
        )));
      }
    }
    for model in &models {
      for relation in &model.relations {
        if !models.iter().any(|m| m.table == relation.target) {
          return Err(Error::Configuration(format!(
            "relation {:?} on {:?} targets unregistered model {:?}",
            relation.name, model.table, relation.target
          )));
        }
      }
    }
    Ok(Self { models })
  }

  pub fn get(&self, table: &str) -> Result<&ModelDefinition> {
    self
      .models
      .iter()
      .find(|m| m.table == table)
      .ok_or_else(|| Error::Configuration(format!("no model registered for {table:?}")))
  }

  pub fn models(&self) -> &[ModelDefinition] { &self.models }
}

// ─── Accessor ────────────────────────────────────────────────────────────────

/// A read-only projection `row -> T`.
///
/// Column accessors come from [`ModelDefinition::accessor`]; computed ones
/// from [`Accessor::derived`]. Neither can write back into the row.
pub struct Accessor<T> {
  name:    String,
  project: Arc<dyn Fn(&Row) -> Result<T> + Send + Sync>,
}

impl<T> Accessor<T> {
  pub fn derived<F>(name: impl Into<String>, project: F) -> Self
  where
    F: Fn(&Row) -> Result<T> + Send + Sync + 'static,
  {
    Self {
      name:    name.into(),
      project: Arc::new(project),
    }
  }

  pub fn name(&self) -> &str { &self.name }

  pub(crate) fn project(&self, row: &Row) -> Result<T> { (self.project)(row) }
}

impl<T> Clone for Accessor<T> {
  fn clone(&self) -> Self {
    Self {
      name:    self.name.clone(),
      project: Arc::clone(&self.project),
    }
  }
}

impl<T> fmt::Debug for Accessor<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Accessor").field("name", &self.name).finish()
  }
}
