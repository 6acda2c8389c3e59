//! Lifecycle hooks as ordered callback lists per stage.
//!
//! `before_*` hooks see what is about to be sent to the database (the query
//! for fetch / find, the row mapping for writes) and may rewrite it in place.
//! `after_*` hooks see the materialised entity or collection. Hooks run in
//! registration order and the first error aborts the rest of the pipeline,
//! including the statement itself when raised before it.

use std::{fmt, sync::Arc};

use crate::{
  entity::Entity,
  error::{Error, Result},
  query::Query,
  value::Row,
};

/// Error type hooks return; any `std::error::Error` converts via `?`.
pub type HookError = Box<dyn std::error::Error + Send + Sync>;

pub type HookResult = std::result::Result<(), HookError>;

pub(crate) type Hook<T> = Arc<dyn Fn(&mut T) -> HookResult + Send + Sync>;

/// Named points of a model's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
  BeforeFetch,
  AfterFetch,
  BeforeFind,
  AfterFind,
  BeforeCreate,
  AfterCreate,
  BeforeSave,
  AfterSave,
  BeforeDelete,
}

impl fmt::Display for LifecycleEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::BeforeFetch => "beforeFetch",
      Self::AfterFetch => "afterFetch",
      Self::BeforeFind => "beforeFind",
      Self::AfterFind => "afterFind",
      Self::BeforeCreate => "beforeCreate",
      Self::AfterCreate => "afterCreate",
      Self::BeforeSave => "beforeSave",
      Self::AfterSave => "afterSave",
      Self::BeforeDelete => "beforeDelete",
    };
    f.write_str(name)
  }
}

/// All hook lists of one model definition.
#[derive(Clone, Default)]
pub struct Hooks {
  pub(crate) before_fetch:  Vec<Hook<Query>>,
  pub(crate) after_fetch:   Vec<Hook<Vec<Entity>>>,
  pub(crate) before_find:   Vec<Hook<Query>>,
  pub(crate) after_find:    Vec<Hook<Entity>>,
  pub(crate) before_create: Vec<Hook<Row>>,
  pub(crate) after_create:  Vec<Hook<Entity>>,
  pub(crate) before_save:   Vec<Hook<Row>>,
  pub(crate) after_save:    Vec<Hook<Entity>>,
  pub(crate) before_delete: Vec<Hook<Row>>,
}

impl Hooks {
  /// Number of hooks registered for `event`.
  pub fn count(&self, event: LifecycleEvent) -> usize {
    match event {
      LifecycleEvent::BeforeFetch => self.before_fetch.len(),
      LifecycleEvent::AfterFetch => self.after_fetch.len(),
      LifecycleEvent::BeforeFind => self.before_find.len(),
      LifecycleEvent::AfterFind => self.after_find.len(),
      LifecycleEvent::BeforeCreate => self.before_create.len(),
      LifecycleEvent::AfterCreate => self.after_create.len(),
      LifecycleEvent::BeforeSave => self.before_save.len(),
      LifecycleEvent::AfterSave => self.after_save.len(),
      LifecycleEvent::BeforeDelete => self.before_delete.len(),
    }
  }
}

impl fmt::Debug for Hooks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Hooks")
      .field("before_fetch", &self.before_fetch.len())
      .field("after_fetch", &self.after_fetch.len())
      .field("before_find", &self.before_find.len())
      .field("after_find", &self.after_find.len())
      .field("before_create", &self.before_create.len())
      .field("after_create", &self.after_create.len())
      .field("before_save", &self.before_save.len())
      .field("after_save", &self.after_save.len())
      .field("before_delete", &self.before_delete.len())
      .finish()
  }
}

/// Run one stage's hooks in order, stopping at the first failure.
pub(crate) fn run_stage<T>(
  table: &str,
  event: LifecycleEvent,
  hooks: &[Hook<T>],
  target: &mut T,
) -> Result<()> {
  for (index, hook) in hooks.iter().enumerate() {
    tracing::debug!(table, %event, index, "running hook");
    hook(target).map_err(|source| Error::Hook { event, source })?;
  }
  Ok(())
}
