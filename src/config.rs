//! Loading engine configuration (data directory + optional exercise catalog)
//! from TOML.
//!
//! See `EngineConfig` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct EngineConfig {
  /// Directory holding the SQLite database. Defaults to "./data".
  #[serde(default)]
  pub data_dir: Option<String>,
  /// Exercise catalog; when empty the built-in seed track is used.
  #[serde(default)]
  pub exercises: Vec<ExerciseCfg>,
}

/// Exercise entry accepted in TOML configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ExerciseCfg {
  pub id: i64,
  pub title: String,
  pub difficulty: String,
  #[serde(default)] pub points: Option<i64>,
  #[serde(default)] pub sort_order: Option<i64>,
  #[serde(default)] pub validator: Option<String>,
}

/// Attempt to load `EngineConfig` from ENGINE_CONFIG_PATH. On any parsing/IO
/// error, returns None and the caller falls back to defaults.
pub fn load_engine_config_from_env() -> Option<EngineConfig> {
  let path = std::env::var("ENGINE_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<EngineConfig>(&s) {
      Ok(cfg) => {
        info!(target: "crawlgym_backend", %path, "Loaded engine config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "crawlgym_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "crawlgym_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_a_catalog_with_partial_fields() {
    let cfg: EngineConfig = toml::from_str(
      r#"
      data_dir = "/tmp/crawlgym"

      [[exercises]]
      id = 1
      title = "Font Camouflage Basics"
      difficulty = "beginner"
      validator = "paged_token"

      [[exercises]]
      id = 2
      title = "Plain Sums"
      difficulty = "beginner"
      points = 20
      sort_order = 9
      "#,
    )
    .unwrap();
    assert_eq!(cfg.data_dir.as_deref(), Some("/tmp/crawlgym"));
    assert_eq!(cfg.exercises.len(), 2);
    assert_eq!(cfg.exercises[0].validator.as_deref(), Some("paged_token"));
    assert_eq!(cfg.exercises[0].points, None);
    assert_eq!(cfg.exercises[1].sort_order, Some(9));
  }

  #[test]
  fn empty_config_defaults_cleanly() {
    let cfg: EngineConfig = toml::from_str("").unwrap();
    assert!(cfg.data_dir.is_none());
    assert!(cfg.exercises.is_empty());
  }
}
