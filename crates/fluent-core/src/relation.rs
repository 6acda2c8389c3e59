//! Relation declarations and the relationship resolver.
//!
//! A [`RelationSpec`] is static: a name, a target model and a kind with
//! optional key overrides. [`RelationSpec::plan`] fills in the defaults
//! against the owning and target definitions and yields a [`RelationPlan`],
//! which the [`Resolver`] turns into queries.

use std::collections::BTreeMap;

use crate::{
  client::DatabaseClient,
  entity::{Entity, Related},
  error::{Error, IntegrityWarning, Result},
  inflect,
  model::ModelDefinition,
  query::{Query, Statement},
  runtime::Runtime,
  value::Value,
};

// ─── Declarations ────────────────────────────────────────────────────────────

/// Relation kinds with their optional key overrides.
///
/// `local_key` is always a column of the owning model and `foreign_key` a
/// column of whichever side holds the reference.
#[derive(Debug, Clone, PartialEq)]
pub enum RelationKind {
  /// `target.foreign_key = owner.local_key`, at most one row.
  HasOne {
    local_key:   Option<String>,
    foreign_key: Option<String>,
  },
  /// `target.foreign_key = owner.local_key`, any number of rows.
  HasMany {
    local_key:   Option<String>,
    foreign_key: Option<String>,
  },
  /// `target.local_key = owner.foreign_key`; `local_key` here names the
  /// target column and defaults to the target's primary key.
  BelongsTo {
    local_key:   Option<String>,
    foreign_key: Option<String>,
  },
  /// Owner and target joined through a pivot table.
  ManyToMany {
    local_key:                 Option<String>,
    foreign_key:               Option<String>,
    pivot_table:               Option<String>,
    pivot_foreign_key:         Option<String>,
    pivot_related_foreign_key: Option<String>,
  },
}

/// A named relation from one model to another.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationSpec {
  pub name:   String,
  /// Table of the target model.
  pub target: String,
  pub kind:   RelationKind,
}

impl RelationSpec {
  fn with_kind(name: impl Into<String>, target: impl Into<String>, kind: RelationKind) -> Self {
    Self {
      name: name.into(),
      target: target.into(),
      kind,
    }
  }

  pub fn has_one(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self::with_kind(name, target, RelationKind::HasOne {
      local_key:   None,
      foreign_key: None,
    })
  }

  pub fn has_many(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self::with_kind(name, target, RelationKind::HasMany {
      local_key:   None,
      foreign_key: None,
    })
  }

  pub fn belongs_to(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self::with_kind(name, target, RelationKind::BelongsTo {
      local_key:   None,
      foreign_key: None,
    })
  }

  pub fn many_to_many(name: impl Into<String>, target: impl Into<String>) -> Self {
    Self::with_kind(name, target, RelationKind::ManyToMany {
      local_key:                 None,
      foreign_key:               None,
      pivot_table:               None,
      pivot_foreign_key:         None,
      pivot_related_foreign_key: None,
    })
  }

  pub fn local_key(mut self, column: impl Into<String>) -> Self {
    match &mut self.kind {
      RelationKind::HasOne { local_key, .. }
      | RelationKind::HasMany { local_key, .. }
      | RelationKind::BelongsTo { local_key, .. }
      | RelationKind::ManyToMany { local_key, .. } => *local_key = Some(column.into()),
    }
    self
  }

  pub fn foreign_key(mut self, column: impl Into<String>) -> Self {
    match &mut self.kind {
      RelationKind::HasOne { foreign_key, .. }
      | RelationKind::HasMany { foreign_key, .. }
      | RelationKind::BelongsTo { foreign_key, .. }
      | RelationKind::ManyToMany { foreign_key, .. } => *foreign_key = Some(column.into()),
    }
    self
  }

  /// Override the pivot table name. Ignored for non-pivot relations.
  pub fn pivot_table(mut self, table: impl Into<String>) -> Self {
    if let RelationKind::ManyToMany { pivot_table, .. } = &mut self.kind {
      *pivot_table = Some(table.into());
    }
    self
  }

  pub fn pivot_foreign_key(mut self, column: impl Into<String>) -> Self {
    if let RelationKind::ManyToMany { pivot_foreign_key, .. } = &mut self.kind {
      *pivot_foreign_key = Some(column.into());
    }
    self
  }

  pub fn pivot_related_foreign_key(mut self, column: impl Into<String>) -> Self {
    if let RelationKind::ManyToMany { pivot_related_foreign_key, .. } = &mut self.kind {
      *pivot_related_foreign_key = Some(column.into());
    }
    self
  }

  /// Compute the query plan, filling every default deterministically.
  ///
  /// | kind        | default                                              |
  /// |-------------|------------------------------------------------------|
  /// | HasOne/Many | `local_key` = owner pk, `foreign_key` = `{owner}_id` |
  /// | BelongsTo   | `foreign_key` = `{target}_id`, `local_key` = target pk |
  /// | ManyToMany  | keys = pks, pivot = `pivot_table_name(owner, target)`, pivot keys `{owner}_id` / `{target}_id` |
  ///
  /// `{x}` is the singular form of the table name.
  pub fn plan(&self, owner: &ModelDefinition, target: &ModelDefinition) -> RelationPlan {
    let or = |value: &Option<String>, default: String| value.clone().unwrap_or(default);
    match &self.kind {
      RelationKind::HasOne { local_key, foreign_key }
      | RelationKind::HasMany { local_key, foreign_key } => RelationPlan::Direct {
        owner_column:  or(local_key, owner.primary_key_name().to_owned()),
        target_table:  target.table().to_owned(),
        target_column: or(foreign_key, inflect::foreign_key_for(owner.table())),
        single:        matches!(self.kind, RelationKind::HasOne { .. }),
      },
      RelationKind::BelongsTo { local_key, foreign_key } => RelationPlan::Direct {
        owner_column:  or(foreign_key, inflect::foreign_key_for(target.table())),
        target_table:  target.table().to_owned(),
        target_column: or(local_key, target.primary_key_name().to_owned()),
        single:        true,
      },
      RelationKind::ManyToMany {
        local_key,
        foreign_key,
        pivot_table,
        pivot_foreign_key,
        pivot_related_foreign_key,
      } => RelationPlan::Pivot {
        owner_column:              or(local_key, owner.primary_key_name().to_owned()),
        pivot_table:               or(
          pivot_table,
          inflect::pivot_table_name(owner.table(), target.table()),
        ),
        pivot_foreign_key:         or(pivot_foreign_key, inflect::foreign_key_for(owner.table())),
        pivot_related_foreign_key: or(
          pivot_related_foreign_key,
          inflect::foreign_key_for(target.table()),
        ),
        target_table:              target.table().to_owned(),
        target_column:             or(foreign_key, target.primary_key_name().to_owned()),
      },
    }
  }
}

// ─── Plan ────────────────────────────────────────────────────────────────────

/// Fully resolved join plan of a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelationPlan {
  /// `target.target_column = owner.owner_column`.
  Direct {
    owner_column:  String,
    target_table:  String,
    target_column: String,
    single:        bool,
  },
  /// `pivot.pivot_foreign_key = owner.owner_column`, then
  /// `target.target_column IN pivot.pivot_related_foreign_key`.
  Pivot {
    owner_column:              String,
    pivot_table:               String,
    pivot_foreign_key:         String,
    pivot_related_foreign_key: String,
    target_table:              String,
    target_column:             String,
  },
}

impl RelationPlan {
  fn owner_column(&self) -> &str {
    match self {
      Self::Direct { owner_column, .. } | Self::Pivot { owner_column, .. } => owner_column,
    }
  }

  fn is_single(&self) -> bool { matches!(self, Self::Direct { single: true, .. }) }
}

// ─── Resolver ────────────────────────────────────────────────────────────────

/// Loads related entities for owners of one model.
///
/// Target rows are fetched through the target model's fetch hooks; pivot
/// rows are read directly.
pub struct Resolver<'r, C> {
  runtime: &'r Runtime<C>,
  owner:   &'r ModelDefinition,
}

impl<'r, C: DatabaseClient> Resolver<'r, C> {
  pub(crate) fn new(runtime: &'r Runtime<C>, owner: &'r ModelDefinition) -> Self {
    Self { runtime, owner }
  }

  /// Resolve `relation` for a single owner. Always queries.
  pub async fn resolve(&self, owner: &Entity, relation: &str) -> Result<Related> {
    let (spec, target, plan) = self.prepare(relation).await?;
    let key = owner
      .value(plan.owner_column())
      .ok_or_else(|| Error::lookup(self.owner.table(), plan.owner_column()))?;

    tracing::debug!(
      owner = self.owner.table(),
      relation = %spec.name,
      "resolving relation"
    );
    let entities: Vec<Entity> = if key.is_null() {
      Vec::new()
    } else {
      self
        .fetch_targets(&plan, target, vec![key.clone()])
        .await?
        .into_iter()
        .map(|(_, entity)| entity)
        .collect()
    };

    Ok(if plan.is_single() {
      Related::One(self.first_of(spec, entities))
    } else {
      Related::Many(entities)
    })
  }

  /// Resolve `relation` for every owner with one query per step and cache
  /// the result on each owner.
  pub async fn eager_load(&self, owners: &mut [Entity], relation: &str) -> Result<()> {
    let (spec, target, plan) = self.prepare(relation).await?;

    let mut keys: Vec<Value> = Vec::new();
    let mut seen = std::collections::BTreeSet::new();
    for owner in owners.iter() {
      let key = owner
        .value(plan.owner_column())
        .ok_or_else(|| Error::lookup(self.owner.table(), plan.owner_column()))?;
      if let Some(group) = key.group_key() {
        if seen.insert(group) {
          keys.push(key.clone());
        }
      }
    }

    tracing::debug!(
      owner = self.owner.table(),
      relation = %spec.name,
      owners = owners.len(),
      keys = keys.len(),
      "eager loading relation"
    );
    let rows = if keys.is_empty() {
      Vec::new()
    } else {
      self.fetch_targets(&plan, target, keys).await?
    };

    let mut grouped: BTreeMap<String, Vec<Entity>> = BTreeMap::new();
    for (group, entity) in rows {
      grouped.entry(group).or_default().push(entity);
    }

    for owner in owners.iter_mut() {
      let matches = owner
        .value(plan.owner_column())
        .and_then(Value::group_key)
        .and_then(|group| grouped.get(&group).cloned())
        .unwrap_or_default();
      let related = if plan.is_single() {
        Related::One(self.first_of(spec, matches))
      } else {
        Related::Many(matches)
      };
      owner.set_loaded(&spec.name, related);
    }
    Ok(())
  }

  /// Look up the relation, its target model and plan, and check that every
  /// column the plan touches exists.
  async fn prepare(
    &self,
    relation: &str,
  ) -> Result<(&'r RelationSpec, &'r ModelDefinition, RelationPlan)> {
    let spec = self.owner.relation_named(relation)?;
    let target = self.runtime.registry().get(&spec.target)?;
    let plan = spec.plan(self.owner, target);

    match &plan {
      RelationPlan::Direct { owner_column, target_column, .. } => {
        self.owner.require_column(owner_column)?;
        target.require_column(target_column)?;
      }
      RelationPlan::Pivot {
        owner_column,
        pivot_table,
        pivot_foreign_key,
        pivot_related_foreign_key,
        target_column,
        ..
      } => {
        self.owner.require_column(owner_column)?;
        target.require_column(target_column)?;
        let columns = self
          .runtime
          .client()
          .table_columns(pivot_table)
          .await
          .map_err(Error::database)?;
        for column in [pivot_foreign_key, pivot_related_foreign_key] {
          if !columns.iter().any(|c| c == column) {
            return Err(Error::lookup(pivot_table, column));
          }
        }
      }
    }
    Ok((spec, target, plan))
  }

  /// Fetch target entities for a set of owner key values, each tagged with
  /// the group key of the owner value it belongs to.
  async fn fetch_targets(
    &self,
    plan: &RelationPlan,
    target: &ModelDefinition,
    keys: Vec<Value>,
  ) -> Result<Vec<(String, Entity)>> {
    match plan {
      RelationPlan::Direct { target_column, target_table, .. } => {
        let query = match <[Value; 1]>::try_from(keys) {
          Ok([key]) => Query::table(target_table.clone()).where_eq(target_column.clone(), key),
          Err(keys) => Query::table(target_table.clone()).where_in(target_column.clone(), keys),
        };
        let entities = self.runtime.fetch(target, query).await?;
        Ok(
          entities
            .into_iter()
            .filter_map(|entity| {
              let group = entity.value(target_column).and_then(Value::group_key)?;
              Some((group, entity))
            })
            .collect(),
        )
      }
      RelationPlan::Pivot {
        pivot_table,
        pivot_foreign_key,
        pivot_related_foreign_key,
        target_table,
        target_column,
        ..
      } => {
        let pivot_query = Query::table(pivot_table.clone()).where_in(pivot_foreign_key.clone(), keys);
        let pivot_rows = self
          .runtime
          .client()
          .execute(&Statement::Select(pivot_query))
          .await
          .map_err(Error::database)?;

        // (owner group, related group) pairs in pivot order, plus the
        // distinct related values to fetch.
        let mut links: Vec<(String, String)> = Vec::new();
        let mut related: Vec<Value> = Vec::new();
        let mut seen = std::collections::BTreeSet::new();
        for row in &pivot_rows {
          let owner_group = row.get(pivot_foreign_key).and_then(Value::group_key);
          let related_value = row.get(pivot_related_foreign_key);
          let (Some(owner_group), Some(related_value)) = (owner_group, related_value) else {
            continue;
          };
          let Some(related_group) = related_value.group_key() else {
            continue;
          };
          if seen.insert(related_group.clone()) {
            related.push(related_value.clone());
          }
          links.push((owner_group, related_group));
        }
        if related.is_empty() {
          return Ok(Vec::new());
        }

        let query = Query::table(target_table.clone()).where_in(target_column.clone(), related);
        let entities = self.runtime.fetch(target, query).await?;

        // Target order is preserved; each target is attached to every owner
        // linked to it.
        let mut out = Vec::new();
        for entity in entities {
          let Some(group) = entity.value(target_column).and_then(Value::group_key) else {
            continue;
          };
          let mut owners_seen = std::collections::BTreeSet::new();
          for (owner_group, related_group) in &links {
            if *related_group == group && owners_seen.insert(owner_group.clone()) {
              out.push((owner_group.clone(), entity.clone()));
            }
          }
        }
        Ok(out)
      }
    }
  }

  /// First match of a single-row relation; more than one is reported.
  fn first_of(&self, spec: &RelationSpec, rows: Vec<Entity>) -> Option<Entity> {
    if rows.len() > 1 && matches!(spec.kind, RelationKind::HasOne { .. }) {
      let warning = IntegrityWarning {
        relation: spec.name.clone(),
        table:    spec.target.clone(),
        matches:  rows.len(),
      };
      tracing::warn!(owner = self.owner.table(), %warning, "integrity warning");
    }
    rows.into_iter().next()
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::*;
  use crate::{fake::FakeClient, model::Registry, schema::ColumnType, value::Row};

  fn categories() -> ModelDefinition {
    ModelDefinition::new("categories")
      .property("name", ColumnType::Text)
      .has_many("articles", "articles")
  }

  fn articles() -> ModelDefinition {
    ModelDefinition::new("articles")
      .property("title", ColumnType::Text)
      .property("category_id", ColumnType::Integer)
      .belongs_to("category", "categories")
      .many_to_many("tags", "tags")
  }

  fn tags() -> ModelDefinition { ModelDefinition::new("tags") }

  #[test]
  fn has_many_defaults_to_singular_owner_key() {
    let plan = categories().relation_named("articles").unwrap().plan(&categories(), &articles());
    assert_eq!(plan, RelationPlan::Direct {
      owner_column:  "id".into(),
      target_table:  "articles".into(),
      target_column: "category_id".into(),
      single:        false,
    });
  }

  #[test]
  fn belongs_to_reads_key_from_owner() {
    let plan = articles().relation_named("category").unwrap().plan(&articles(), &categories());
    assert_eq!(plan, RelationPlan::Direct {
      owner_column:  "category_id".into(),
      target_table:  "categories".into(),
      target_column: "id".into(),
      single:        true,
    });
  }

  #[test]
  fn many_to_many_default_pivot() {
    let plan = articles().relation_named("tags").unwrap().plan(&articles(), &tags());
    assert_eq!(plan, RelationPlan::Pivot {
      owner_column:              "id".into(),
      pivot_table:               "article_tag".into(),
      pivot_foreign_key:         "article_id".into(),
      pivot_related_foreign_key: "tag_id".into(),
      target_table:              "tags".into(),
      target_column:             "id".into(),
    });
  }

  #[test]
  fn overrides_win_over_defaults() {
    let spec = RelationSpec::many_to_many("labels", "tags")
      .pivot_table("article_labels")
      .pivot_foreign_key("post")
      .pivot_related_foreign_key("label");
    let RelationPlan::Pivot { pivot_table, pivot_foreign_key, pivot_related_foreign_key, .. } =
      spec.plan(&articles(), &tags())
    else {
      panic!("expected a pivot plan");
    };
    assert_eq!(pivot_table, "article_labels");
    assert_eq!(pivot_foreign_key, "post");
    assert_eq!(pivot_related_foreign_key, "label");

    let spec = RelationSpec::has_one("profile", "profiles")
      .local_key("uuid")
      .foreign_key("owner_uuid");
    let plan = spec.plan(&categories(), &tags());
    assert!(matches!(plan, RelationPlan::Direct { ref owner_column, ref target_column, single: true, .. }
      if owner_column == "uuid" && target_column == "owner_uuid"));
  }

  #[tokio::test]
  async fn pivot_without_related_key_is_a_lookup_error() {
    let client = FakeClient::default();
    client.set_columns("article_tag", &["article_id"]);
    let registry = Registry::new(vec![categories(), articles(), tags()]).unwrap();
    let runtime = Runtime::new(Arc::new(client), registry);
    let model = runtime.model("articles").unwrap();

    let article = Entity::new("articles", "id", Row::from([("id".to_owned(), Value::Integer(1))]));
    let err = model.related(&article, "tags").await.unwrap_err();
    assert!(matches!(err, Error::Lookup { ref table, ref column }
      if table == "article_tag" && column == "tag_id"));
    // Rejected before any pivot row is read.
    assert!(runtime.client().statements().is_empty());
  }
}
