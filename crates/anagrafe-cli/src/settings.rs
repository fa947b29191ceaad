//! Runtime configuration: TOML file, then `ANAGRAFE_*` environment
//! variables, then command-line flags.

use std::path::{Path, PathBuf};

use anagrafe_core::{persistence::DEFAULT_SLOT, store::ValidationPolicy};
use anyhow::Context as _;
use serde::Deserialize;

/// Config file read when `--config` is not given. Optional.
pub const DEFAULT_CONFIG_FILE: &str = "anagrafe.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// SQLite database file. A leading `~/` is expanded.
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,

  /// Key-value slot that holds the registry.
  #[serde(default = "default_slot")]
  pub slot: String,

  /// Where the terminal UI writes its log.
  #[serde(default = "default_log_file")]
  pub log_file: PathBuf,

  #[serde(default = "default_log_level")]
  pub log_level: String,

  /// Reject structurally invalid fiscal codes, not just wrong lengths.
  #[serde(default)]
  pub enforce_fiscal_code_format: bool,
}

fn default_store_path() -> PathBuf { PathBuf::from("anagrafe.db") }

fn default_slot() -> String { DEFAULT_SLOT.to_owned() }

fn default_log_file() -> PathBuf { PathBuf::from("anagrafe.log") }

fn default_log_level() -> String { "info".to_owned() }

impl Settings {
  /// Layer the config file (required only when `explicit`) under the
  /// environment.
  pub fn load(path: &Path, explicit: bool) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(explicit))
      .add_source(config::Environment::with_prefix("ANAGRAFE"))
      .build()
      .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut settings: Settings = settings
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.store_path = expand_tilde(&settings.store_path);
    settings.log_file = expand_tilde(&settings.log_file);
    Ok(settings)
  }

  pub fn policy(&self) -> ValidationPolicy {
    ValidationPolicy { enforce_fiscal_code_format: self.enforce_fiscal_code_format }
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
