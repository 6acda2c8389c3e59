//! Runtime settings, read from `fluent.toml` and `FLUENT_*` variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file; `:memory:` for a throwaway database.
  pub database:   PathBuf,
  /// `tracing` filter used when `RUST_LOG` is unset.
  pub log_filter: String,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database:   PathBuf::from("fluent.db"),
      log_filter: "info".to_owned(),
    }
  }
}

impl Settings {
  /// File values first, environment on top. A missing file is not an error.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("FLUENT"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise Settings")?;

    Ok(Self {
      database: expand_tilde(&settings.database),
      ..settings
    })
  }

  pub fn is_in_memory(&self) -> bool { self.database.as_os_str() == ":memory:" }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
