//! The migration ledger: ordered, batched bookkeeping of applied migrations.
//!
//! Every successful `up` leaves one row in [`LEDGER_TABLE`]. All rows written
//! by one [`Migrator::run`] share a batch number; [`Migrator::rollback`]
//! reverts the highest batch as a unit.
//!
//! Each migration is applied atomically together with its ledger row. A run
//! is not: when the third of five pending migrations fails, the first two
//! stay applied and recorded.
//!
//! The migrator serialises `run`, `rollback` and `fresh` on itself only.
//! Two processes migrating the same database at once must be prevented by
//! the caller.

use std::{collections::BTreeSet, fmt, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
  client::DatabaseClient,
  error::{Error, Result},
  migration::Migration,
  query::{Order, Query, Statement},
  schema::{Direction, SchemaDescriptor},
  value::{Row, Value},
};

/// Name of the ledger table.
pub const LEDGER_TABLE: &str = "fluent_schemas";

// ─── Records ─────────────────────────────────────────────────────────────────

/// One row of the ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationRecord {
  pub id:         i64,
  pub name:       String,
  pub batch:      i64,
  pub applied_at: DateTime<Utc>,
}

impl MigrationRecord {
  fn from_row(row: &Row) -> Result<Self> {
    let field = |column: &str| {
      row
        .get(column)
        .ok_or_else(|| Error::Ledger(format!("missing column {column:?}")))
    };
    let malformed = |column: &str, value: &Value| {
      Error::Ledger(format!("column {column:?} holds unexpected value {value}"))
    };

    let id = field("id")?;
    let name = field("name")?;
    let batch = field("batch")?;
    let time = field("migration_time")?;
    Ok(Self {
      id:         id.as_i64().ok_or_else(|| malformed("id", id))?,
      name:       name.as_str().ok_or_else(|| malformed("name", name))?.to_owned(),
      batch:      batch.as_i64().ok_or_else(|| malformed("batch", batch))?,
      applied_at: time.as_timestamp().ok_or_else(|| malformed("migration_time", time))?,
    })
  }
}

/// Registered migration with its ledger state.
#[derive(Debug, Clone, PartialEq)]
pub struct MigrationStatus {
  pub name:   String,
  /// `None` while pending.
  pub record: Option<MigrationRecord>,
}

impl MigrationStatus {
  pub fn is_applied(&self) -> bool { self.record.is_some() }
}

impl fmt::Display for MigrationStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.record {
      Some(record) => write!(
        f,
        "{}  batch {}  {}",
        self.name,
        record.batch,
        record.applied_at.to_rfc3339()
      ),
      None => write!(f, "{}  pending", self.name),
    }
  }
}

// ─── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
  /// The batch written, or `None` when nothing was pending.
  pub batch:   Option<i64>,
  pub applied: Vec<String>,
}

/// Outcome of [`Migrator::rollback`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rollback {
  /// The ledger was empty.
  Nothing,
  Batch { batch: i64, reverted: Vec<String> },
}

impl fmt::Display for Rollback {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Nothing => f.write_str("nothing to rollback"),
      Self::Batch { batch, reverted } => {
        write!(f, "rolled back batch {batch}: {}", reverted.join(", "))
      }
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FreshReport {
  /// Names reverted, last batch first.
  pub reverted: Vec<String>,
  pub run:      RunReport,
}

// ─── Migrator ────────────────────────────────────────────────────────────────

/// Applies and reverts an ordered list of migrations through a client.
pub struct Migrator<C> {
  client:     Arc<C>,
  migrations: Vec<Box<dyn Migration>>,
  lock:       Mutex<()>,
}

impl<C: DatabaseClient> Migrator<C> {
  /// Register `migrations` in application order.
  ///
  /// Fails with a configuration error on an empty or duplicated name.
  pub fn new(client: Arc<C>, migrations: Vec<Box<dyn Migration>>) -> Result<Self> {
    let mut names = BTreeSet::new();
    for migration in &migrations {
      let name = migration.name();
      if name.is_empty() {
        return Err(Error::Configuration("migration with an empty name".into()));
      }
      if !names.insert(name) {
        return Err(Error::Configuration(format!("migration {name:?} is registered twice")));
      }
    }
    Ok(Self {
      client,
      migrations,
      lock: Mutex::new(()),
    })
  }

  pub fn migrations(&self) -> impl Iterator<Item = &dyn Migration> {
    self.migrations.iter().map(|m| m.as_ref())
  }

  /// Create the ledger table if it does not exist yet.
  pub async fn ensure_ledger(&self) -> Result<()> {
    let descriptor = SchemaDescriptor::create_table_if_not_exists(LEDGER_TABLE, |t| {
      t.id();
      t.string("name", 255).not_null().unique();
      t.integer("batch").not_null();
      t.timestamp("migration_time").not_null();
    });
    self.execute(&Statement::Schema(descriptor)).await?;
    Ok(())
  }

  /// All ledger rows in insertion order.
  pub async fn applied(&self) -> Result<Vec<MigrationRecord>> {
    self.ensure_ledger().await?;
    let query = Query::table(LEDGER_TABLE).order_by("id", Order::Asc);
    self
      .execute(&Statement::Select(query))
      .await?
      .iter()
      .map(MigrationRecord::from_row)
      .collect()
  }

  /// Names of registered migrations without a ledger row, in order.
  pub async fn pending(&self) -> Result<Vec<String>> {
    Ok(
      self
        .status()
        .await?
        .into_iter()
        .filter(|s| !s.is_applied())
        .map(|s| s.name)
        .collect(),
    )
  }

  /// Every registered migration, in order, with its ledger row if any.
  pub async fn status(&self) -> Result<Vec<MigrationStatus>> {
    let mut records = self.applied().await?;
    Ok(
      self
        .migrations
        .iter()
        .map(|migration| {
          let position = records.iter().position(|r| r.name == migration.name());
          MigrationStatus {
            name:   migration.name().to_owned(),
            record: position.map(|i| records.swap_remove(i)),
          }
        })
        .collect(),
    )
  }

  /// Apply every pending migration as one new batch.
  pub async fn run(&self) -> Result<RunReport> {
    let _guard = self.lock.try_lock().map_err(|_| Error::MigrationInProgress)?;
    self.run_locked().await
  }

  /// Revert the most recent batch.
  pub async fn rollback(&self) -> Result<Rollback> {
    let _guard = self.lock.try_lock().map_err(|_| Error::MigrationInProgress)?;
    self.rollback_locked().await
  }

  /// Roll back every batch, then run everything as batch 1.
  pub async fn fresh(&self) -> Result<FreshReport> {
    let _guard = self.lock.try_lock().map_err(|_| Error::MigrationInProgress)?;

    let mut reverted = Vec::new();
    while let Rollback::Batch { reverted: names, .. } = self.rollback_locked().await? {
      reverted.extend(names);
    }
    let run = self.run_locked().await?;
    Ok(FreshReport { reverted, run })
  }

  // ── Locked bodies ─────────────────────────────────────────────────────

  async fn run_locked(&self) -> Result<RunReport> {
    let records = self.applied().await?;
    let done: BTreeSet<&str> = records.iter().map(|r| r.name.as_str()).collect();

    let pending: Vec<&dyn Migration> = self
      .migrations()
      .filter(|m| {
        let skip = done.contains(m.name());
        if skip {
          tracing::debug!(migration = m.name(), "already applied, skipping");
        }
        !skip
      })
      .collect();
    if pending.is_empty() {
      tracing::info!("nothing to migrate");
      return Ok(RunReport::default());
    }

    let batch = records.iter().map(|r| r.batch).max().unwrap_or(0) + 1;
    let applied_at = Utc::now();
    let mut applied = Vec::with_capacity(pending.len());

    for migration in pending {
      let name = migration.name();
      let mut statements: Vec<Statement> = migration
        .descriptors(Direction::Up)
        .into_iter()
        .map(Statement::Schema)
        .collect();
      statements.push(Statement::Insert {
        table:  LEDGER_TABLE.to_owned(),
        values: Row::from([
          ("name".to_owned(), Value::from(name)),
          ("batch".to_owned(), Value::Integer(batch)),
          ("migration_time".to_owned(), Value::Timestamp(applied_at)),
        ]),
      });

      self
        .client
        .execute_atomic(&statements)
        .await
        .map_err(|source| Error::MigrationFailed {
          name:      name.to_owned(),
          direction: Direction::Up,
          completed: applied.clone(),
          source:    Box::new(source),
        })?;
      tracing::info!(migration = name, batch, "migrated");
      applied.push(name.to_owned());
    }

    Ok(RunReport {
      batch: Some(batch),
      applied,
    })
  }

  async fn rollback_locked(&self) -> Result<Rollback> {
    let records = self.applied().await?;
    let Some(batch) = records.iter().map(|r| r.batch).max() else {
      tracing::info!("nothing to rollback");
      return Ok(Rollback::Nothing);
    };
    let in_batch: BTreeSet<&str> = records
      .iter()
      .filter(|r| r.batch == batch)
      .map(|r| r.name.as_str())
      .collect();

    if let Some(unknown) = in_batch
      .iter()
      .find(|name| !self.migrations().any(|m| m.name() == **name))
    {
      return Err(Error::Configuration(format!(
        "batch {batch} contains migration {unknown:?}, which is not registered"
      )));
    }

    let mut reverted = Vec::with_capacity(in_batch.len());
    for migration in self.migrations.iter().rev() {
      let name = migration.name();
      if !in_batch.contains(name) {
        continue;
      }
      let mut statements: Vec<Statement> = migration
        .descriptors(Direction::Down)
        .into_iter()
        .map(Statement::Schema)
        .collect();
      statements.push(Statement::Delete {
        table:      LEDGER_TABLE.to_owned(),
        conditions: Query::table(LEDGER_TABLE).where_eq("name", name).conditions,
      });

      self
        .client
        .execute_atomic(&statements)
        .await
        .map_err(|source| Error::MigrationFailed {
          name:      name.to_owned(),
          direction: Direction::Down,
          completed: reverted.clone(),
          source:    Box::new(source),
        })?;
      tracing::info!(migration = name, batch, "rolled back");
      reverted.push(name.to_owned());
    }

    Ok(Rollback::Batch { batch, reverted })
  }

  async fn execute(&self, statement: &Statement) -> Result<Vec<Row>> {
    self
      .client
      .execute(statement)
      .await
      .map_err(Error::database)
  }
}
