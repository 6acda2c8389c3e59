//! The model runtime: finders, writes and the hook pipeline.
//!
//! ```rust,ignore
//! let runtime = Runtime::new(client, Registry::new(models)?);
//! let articles = runtime.model("articles")?;
//! let article = articles.find_or_fail(1).await?;
//! let tags = articles.related(&article, "tags").await?;
//! ```

use std::{collections::BTreeSet, sync::Arc};

use chrono::Utc;

use crate::{
  client::DatabaseClient,
  entity::{Entity, Related},
  error::{Error, Result},
  hooks::{LifecycleEvent, run_stage},
  model::{CREATED_AT, ModelDefinition, Registry, UPDATED_AT},
  query::{Condition, Order, Query, Statement},
  relation::Resolver,
  value::{Row, Value},
};

// ─── Runtime ─────────────────────────────────────────────────────────────────

/// Binds a registry of model definitions to a database client.
///
/// Cloning is cheap; both halves are reference-counted.
pub struct Runtime<C> {
  client:   Arc<C>,
  registry: Arc<Registry>,
}

impl<C> Clone for Runtime<C> {
  fn clone(&self) -> Self {
    Self {
      client:   Arc::clone(&self.client),
      registry: Arc::clone(&self.registry),
    }
  }
}

impl<C: DatabaseClient> Runtime<C> {
  pub fn new(client: Arc<C>, registry: Registry) -> Self {
    Self {
      client,
      registry: Arc::new(registry),
    }
  }

  pub fn client(&self) -> &C { &self.client }

  pub fn registry(&self) -> &Registry { &self.registry }

  /// Handle for the model registered under `table`.
  pub fn model(&self, table: &str) -> Result<Model<'_, C>> {
    Ok(Model {
      runtime:    self,
      definition: self.registry.get(table)?,
    })
  }

  /// `before_fetch → query → after_fetch` for `definition`.
  pub(crate) async fn fetch(
    &self,
    definition: &ModelDefinition,
    mut query: Query,
  ) -> Result<Vec<Entity>> {
    let hooks = definition.hooks();
    run_stage(definition.table(), LifecycleEvent::BeforeFetch, &hooks.before_fetch, &mut query)?;

    let rows = self.select(query).await?;
    let mut entities: Vec<Entity> = rows
      .into_iter()
      .map(|row| Entity::new(definition.table(), definition.primary_key_name(), row))
      .collect();

    run_stage(definition.table(), LifecycleEvent::AfterFetch, &hooks.after_fetch, &mut entities)?;
    Ok(entities)
  }

  async fn select(&self, query: Query) -> Result<Vec<Row>> {
    self.run(&Statement::Select(query)).await
  }

  async fn run(&self, statement: &Statement) -> Result<Vec<Row>> {
    tracing::debug!(table = statement.table(), "executing statement");
    self.client.execute(statement).await.map_err(Error::database)
  }
}

// ─── Model handle ────────────────────────────────────────────────────────────

/// Operations on one registered model.
pub struct Model<'r, C> {
  runtime:    &'r Runtime<C>,
  definition: &'r ModelDefinition,
}

impl<'r, C: DatabaseClient> Model<'r, C> {
  pub fn definition(&self) -> &'r ModelDefinition { self.definition }

  fn table(&self) -> &'r str { self.definition.table() }

  fn entity(&self, row: Row) -> Entity {
    Entity::new(self.table(), self.definition.primary_key_name(), row)
  }

  // ── Collection finders ────────────────────────────────────────────────

  /// Every row of the table.
  pub async fn all(&self) -> Result<Vec<Entity>> {
    self.runtime.fetch(self.definition, Query::table(self.table())).await
  }

  /// Every row where `column = value`.
  pub async fn where_eq(&self, column: &str, value: impl Into<Value>) -> Result<Vec<Entity>> {
    self.definition.require_column(column)?;
    let query = Query::table(self.table()).where_eq(column, value);
    self.runtime.fetch(self.definition, query).await
  }

  // ── Single-row finders ────────────────────────────────────────────────

  pub async fn find(&self, id: impl Into<Value>) -> Result<Option<Entity>> {
    self.find_by(self.definition.primary_key_name(), id).await
  }

  pub async fn find_or_fail(&self, id: impl Into<Value>) -> Result<Entity> {
    self.find_by_or_fail(self.definition.primary_key_name(), id).await
  }

  pub async fn find_by(&self, column: &str, value: impl Into<Value>) -> Result<Option<Entity>> {
    self.definition.require_column(column)?;
    let query = Query::table(self.table()).where_eq(column, value).limit(1);
    self.find_one(query).await
  }

  pub async fn find_by_or_fail(&self, column: &str, value: impl Into<Value>) -> Result<Entity> {
    let value = value.into();
    self
      .find_by(column, value.clone())
      .await?
      .ok_or_else(|| Error::NotFound {
        table: self.table().to_owned(),
        column: column.to_owned(),
        value,
      })
  }

  /// First row of the table by primary key, without filter.
  pub async fn first(&self) -> Result<Option<Entity>> {
    let query = Query::table(self.table())
      .order_by(self.definition.primary_key_name(), Order::Asc)
      .limit(1);
    self.find_one(query).await
  }

  pub async fn first_or_fail(&self) -> Result<Entity> {
    self.first().await?.ok_or_else(|| Error::NotFound {
      table:  self.table().to_owned(),
      column: self.definition.primary_key_name().to_owned(),
      value:  Value::Null,
    })
  }

  /// `before_find → query → after_find`.
  async fn find_one(&self, mut query: Query) -> Result<Option<Entity>> {
    let hooks = self.definition.hooks();
    run_stage(self.table(), LifecycleEvent::BeforeFind, &hooks.before_find, &mut query)?;

    let Some(row) = self.runtime.select(query).await?.into_iter().next() else {
      return Ok(None);
    };
    let mut entity = self.entity(row);
    run_stage(self.table(), LifecycleEvent::AfterFind, &hooks.after_find, &mut entity)?;
    Ok(Some(entity))
  }

  // ── Writes ────────────────────────────────────────────────────────────

  /// `before_create → before_save → insert → after_create → after_save`.
  ///
  /// The returned entity holds the row as stored, including generated keys
  /// and defaults.
  pub async fn create(&self, values: Row) -> Result<Entity> {
    let hooks = self.definition.hooks();
    let mut row = values;
    if self.definition.has_timestamps() {
      let now = Value::Timestamp(Utc::now());
      row.entry(CREATED_AT.to_owned()).or_insert_with(|| now.clone());
      row.entry(UPDATED_AT.to_owned()).or_insert(now);
    }

    run_stage(self.table(), LifecycleEvent::BeforeCreate, &hooks.before_create, &mut row)?;
    run_stage(self.table(), LifecycleEvent::BeforeSave, &hooks.before_save, &mut row)?;
    self.require_columns(&row)?;

    let statement = Statement::Insert {
      table:  self.table().to_owned(),
      values: row,
    };
    let stored = self.single_result(self.runtime.run(&statement).await?, "insert")?;
    let mut entity = self.entity(stored);
    tracing::debug!(table = self.table(), "created row");

    run_stage(self.table(), LifecycleEvent::AfterCreate, &hooks.after_create, &mut entity)?;
    run_stage(self.table(), LifecycleEvent::AfterSave, &hooks.after_save, &mut entity)?;
    Ok(entity)
  }

  /// `before_save → update → after_save`.
  ///
  /// `changes` are merged over the entity's snapshot; `before_save` hooks
  /// see and may rewrite the merged row. Only the changed columns and the
  /// ones hooks rewrote are sent, so snapshot columns the model does not
  /// declare never reach the statement. On success the snapshot is replaced
  /// by the row as stored.
  pub async fn update(&self, entity: &mut Entity, changes: Row) -> Result<()> {
    if entity.is_deleted() {
      return Err(Error::Deleted(self.table().to_owned()));
    }
    let pk = self.definition.primary_key_name();
    let id = entity.id()?.clone();
    let hooks = self.definition.hooks();

    let mut touched: BTreeSet<String> = changes.keys().cloned().collect();
    let mut row = entity.row().clone();
    row.extend(changes);
    if self.definition.has_timestamps() {
      touched.insert(UPDATED_AT.to_owned());
      row.insert(UPDATED_AT.to_owned(), Value::Timestamp(Utc::now()));
    }

    run_stage(self.table(), LifecycleEvent::BeforeSave, &hooks.before_save, &mut row)?;
    let snapshot = entity.row();
    let values: Row = row
      .into_iter()
      .filter(|(column, value)| {
        column != pk && (touched.contains(column) || snapshot.get(column) != Some(value))
      })
      .collect();
    self.require_columns(&values)?;

    let statement = Statement::Update {
      table:      self.table().to_owned(),
      values,
      conditions: vec![Condition::Eq(pk.to_owned(), id.clone())],
    };
    let rows = self.runtime.run(&statement).await?;
    let stored = rows.into_iter().next().ok_or_else(|| Error::NotFound {
      table:  self.table().to_owned(),
      column: pk.to_owned(),
      value:  id,
    })?;
    entity.replace_row(stored);

    run_stage(self.table(), LifecycleEvent::AfterSave, &hooks.after_save, entity)?;
    Ok(())
  }

  /// `before_delete → delete`. The entity is terminal afterwards.
  pub async fn delete(&self, entity: &mut Entity) -> Result<()> {
    if entity.is_deleted() {
      return Err(Error::Deleted(self.table().to_owned()));
    }
    let pk = self.definition.primary_key_name();
    let id = entity.id()?.clone();

    let mut row = entity.row().clone();
    run_stage(
      self.table(),
      LifecycleEvent::BeforeDelete,
      &self.definition.hooks().before_delete,
      &mut row,
    )?;

    let statement = Statement::Delete {
      table:      self.table().to_owned(),
      conditions: vec![Condition::Eq(pk.to_owned(), id)],
    };
    self.runtime.run(&statement).await?;
    entity.mark_deleted();
    tracing::debug!(table = self.table(), "deleted row");
    Ok(())
  }

  // ── Relations ─────────────────────────────────────────────────────────

  /// Resolve `relation` for `entity`. Lazy: queries on every call.
  pub async fn related(&self, entity: &Entity, relation: &str) -> Result<Related> {
    Resolver::new(self.runtime, self.definition)
      .resolve(entity, relation)
      .await
  }

  /// Eagerly load `relation` for every entity; read it back with
  /// [`Entity::loaded`].
  pub async fn load(&self, entities: &mut [Entity], relation: &str) -> Result<()> {
    Resolver::new(self.runtime, self.definition)
      .eager_load(entities, relation)
      .await
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  fn require_columns(&self, row: &Row) -> Result<()> {
    row
      .keys()
      .try_for_each(|column| self.definition.require_column(column))
  }

  fn single_result(&self, rows: Vec<Row>, operation: &str) -> Result<Row> {
    rows.into_iter().next().ok_or_else(|| {
      Error::Database(format!("{operation} into {:?} returned no row", self.table()).into())
    })
  }
}
