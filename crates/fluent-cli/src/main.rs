//! `fluent`: migrate, seed and inspect the sample blog database.
//!
//! Reads `fluent.toml` (or the path given with `--config`) and `FLUENT_*`
//! environment variables, then opens the configured SQLite database.
//!
//! ```text
//! fluent migrate run
//! fluent migrate status
//! fluent seed
//! fluent show 1
//! ```

mod blog;
mod commands;
mod settings;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use fluent_store_sqlite::SqliteClient;
use settings::Settings;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Migration ledger and model runtime for the fluent blog")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "fluent.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Apply, revert or inspect schema migrations.
  #[command(subcommand)]
  Migrate(Migrate),

  /// Insert sample categories, articles and tags.
  Seed,

  /// Print a category with its articles and their tags as JSON.
  Show {
    /// Primary key of the category.
    category: i64,
  },
}

#[derive(Subcommand)]
enum Migrate {
  /// Apply every pending migration as a new batch.
  Run,
  /// Revert the most recent batch.
  Rollback,
  /// Revert everything, then apply everything as batch 1.
  Fresh,
  /// List migrations with their batch or `pending`.
  Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  // `RUST_LOG` wins over the configured filter.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
    )
    .init();

  let client = if settings.is_in_memory() {
    SqliteClient::open_in_memory().await
  } else {
    SqliteClient::open(&settings.database).await
  }
  .with_context(|| format!("failed to open database at {:?}", settings.database))?;
  let client = Arc::new(client);

  match cli.command {
    Command::Migrate(Migrate::Run) => commands::migrate_run(client).await,
    Command::Migrate(Migrate::Rollback) => commands::migrate_rollback(client).await,
    Command::Migrate(Migrate::Fresh) => commands::migrate_fresh(client).await,
    Command::Migrate(Migrate::Status) => commands::migrate_status(client).await,
    Command::Seed => commands::seed(client).await,
    Command::Show { category } => commands::show(client, category).await,
  }
}
