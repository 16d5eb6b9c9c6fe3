//! Gateway configuration: upstream API location, local data directory, and
//! listen port.
//!
//! A TOML file can be supplied via QUIZDESK_CONFIG_PATH; individual fields
//! can then be overridden with UPSTREAM_API_BASE, QUIZDESK_DATA_DIR and PORT.
//! Every field has a default, so the gateway also starts with no config at
//! all.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  /// Base URL of the upstream REST API, including the `/api` prefix.
  pub upstream_base: String,
  /// Directory holding the local-tier JSON files.
  pub data_dir: PathBuf,
  pub port: u16,
  /// Per-request timeout for upstream calls; an expired timeout is treated
  /// like any other remote failure.
  pub upstream_timeout_secs: u64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      upstream_base: "http://localhost:5000/api".into(),
      data_dir: PathBuf::from("./data"),
      port: 3000,
      upstream_timeout_secs: 20,
    }
  }
}

/// Load config from QUIZDESK_CONFIG_PATH (if set and parseable), then apply
/// env overrides. Parse/IO failures fall back to defaults rather than
/// aborting startup.
pub fn load_config() -> AppConfig {
  let mut cfg = match std::env::var("QUIZDESK_CONFIG_PATH") {
    Ok(path) => match std::fs::read_to_string(&path) {
      Ok(s) => match toml::from_str::<AppConfig>(&s) {
        Ok(cfg) => {
          info!(target: "quizdesk", %path, "Loaded gateway config (TOML)");
          cfg
        }
        Err(e) => {
          error!(target: "quizdesk", %path, error = %e, "Failed to parse TOML config");
          AppConfig::default()
        }
      },
      Err(e) => {
        error!(target: "quizdesk", %path, error = %e, "Failed to read TOML config file");
        AppConfig::default()
      }
    },
    Err(_) => AppConfig::default(),
  };

  if let Ok(base) = std::env::var("UPSTREAM_API_BASE") {
    cfg.upstream_base = base;
  }
  if let Ok(dir) = std::env::var("QUIZDESK_DATA_DIR") {
    cfg.data_dir = PathBuf::from(dir);
  }
  if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse::<u16>().ok()) {
    cfg.port = port;
  }
  cfg
}
