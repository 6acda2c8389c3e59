//! Core types and trait definitions for the fluent ORM.
//!
//! This crate holds the schema descriptors, the migration ledger, the
//! relationship resolver and the model runtime. It is free of any database
//! driver: every statement goes through the [`client::DatabaseClient`] trait,
//! implemented by backends such as `fluent-store-sqlite`.

pub mod client;
pub mod entity;
pub mod error;
pub mod hooks;
pub mod inflect;
pub mod ledger;
pub mod migration;
pub mod model;
pub mod query;
pub mod relation;
pub mod runtime;
pub mod schema;
pub mod value;

pub use client::DatabaseClient;
pub use entity::{Entity, Related};
pub use error::{Error, IntegrityWarning, Result};
pub use hooks::LifecycleEvent;
pub use ledger::{
  FreshReport, LEDGER_TABLE, MigrationRecord, MigrationStatus, Migrator, Rollback, RunReport,
};
pub use migration::{Migration, SchemaMigration, conventional_name};
pub use model::{Accessor, ModelDefinition, Registry};
pub use query::{Condition, Query, Statement};
pub use relation::RelationSpec;
pub use runtime::{Model, Runtime};
pub use schema::{ColumnType, Direction, SchemaDescriptor};
pub use value::{FromValue, Row, Value};

#[cfg(test)]
mod fake;
