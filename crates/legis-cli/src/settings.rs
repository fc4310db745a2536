//! Layered runtime configuration.
//!
//! Sources, lowest precedence first: built-in defaults, the TOML file, then
//! `LEGIS_*` environment variables (`__` separates nested keys, e.g.
//! `LEGIS_INGEST__PAGE_SIZE`). The bare `OPENSTATES_API_KEY` and
//! `ANTHROPIC_API_KEY` variables override everything.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use legis_ingest::{IngestOptions, RetryPolicy};
use legis_sources::{AnthropicConfig, OpenStatesConfig, anthropic, openstates};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  pub host:          String,
  pub port:          u16,
  pub database_path: PathBuf,
  pub cors_origins:  Vec<String>,
  pub openstates:    OpenStatesConfig,
  pub anthropic:     AnthropicConfig,
  pub ingest:        IngestSettings,
}

/// Pacing for `legis ingest`, in plain numbers so it can come from env vars.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestSettings {
  pub page_size:     u32,
  pub bill_delay_ms: u64,
  pub page_delay_ms: u64,
  pub max_attempts:  u32,
  pub backoff_ms:    u64,
}

impl IngestSettings {
  pub fn options(&self) -> IngestOptions {
    IngestOptions {
      page_size:  self.page_size,
      bill_delay: Duration::from_millis(self.bill_delay_ms),
      page_delay: Duration::from_millis(self.page_delay_ms),
      retry:      RetryPolicy {
        max_attempts: self.max_attempts,
        base_delay:   Duration::from_millis(self.backoff_ms),
      },
    }
  }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
  Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8000)?
    .set_default("database_path", "legis.db")?
    .set_default("cors_origins", vec!["http://localhost:3000"])?
    .set_default("openstates.base_url", openstates::DEFAULT_BASE_URL)?
    .set_default("openstates.api_key", "")?
    .set_default("anthropic.base_url", anthropic::DEFAULT_BASE_URL)?
    .set_default("anthropic.api_key", "")?
    .set_default("anthropic.model", anthropic::DEFAULT_MODEL)?
    .set_default("ingest.page_size", 20)?
    .set_default("ingest.bill_delay_ms", 1_000)?
    .set_default("ingest.page_delay_ms", 3_000)?
    .set_default("ingest.max_attempts", 3)?
    .set_default("ingest.backoff_ms", 2_000)
}

/// Load settings from `path` (optional) and the environment.
pub fn load(path: &Path) -> Result<Settings, ConfigError> {
  defaults()?
    .add_source(File::from(path).required(false))
    .add_source(
      Environment::with_prefix("LEGIS")
        .prefix_separator("_")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("cors_origins")
        .try_parsing(true),
    )
    .set_override_option("openstates.api_key", std::env::var("OPENSTATES_API_KEY").ok())?
    .set_override_option("anthropic.api_key", std::env::var("ANTHROPIC_API_KEY").ok())?
    .build()?
    .try_deserialize()
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
