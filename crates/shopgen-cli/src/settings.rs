//! Layered configuration for the `shopgen` binary.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;
use shopgen_core::{
  build::{BuildOptions, ErrorPolicy},
  generate::{DEFAULT_SEED, GeneratorConfig, InteractionRule},
  lifecycle::{DEFAULT_BATCH_SIZE, DEFAULT_MAX_ROUNDS, ResetOptions},
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub store_path:            PathBuf,
  pub seed:                  u64,
  pub reset_batch_size:      usize,
  pub max_reset_rounds:      usize,
  pub interaction_rule:      InteractionRule,
  pub error_policy:          ErrorPolicy,
  pub force_recreate_schema: bool,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      store_path:            PathBuf::from("shopgen.db"),
      seed:                  DEFAULT_SEED,
      reset_batch_size:      DEFAULT_BATCH_SIZE,
      max_reset_rounds:      DEFAULT_MAX_ROUNDS,
      interaction_rule:      InteractionRule::default(),
      error_policy:          ErrorPolicy::default(),
      force_recreate_schema: false,
    }
  }
}

impl AppConfig {
  /// Read `path` (if it exists) layered under `SHOPGEN_*` environment
  /// variables.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SHOPGEN").try_parsing(true))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise AppConfig")
  }

  pub fn build_options(&self) -> BuildOptions {
    BuildOptions {
      generator:    GeneratorConfig { seed: self.seed, interaction_rule: self.interaction_rule },
      reset:        ResetOptions {
        batch_size: self.reset_batch_size,
        max_rounds: self.max_reset_rounds,
      },
      error_policy: self.error_policy,
    }
  }
}
