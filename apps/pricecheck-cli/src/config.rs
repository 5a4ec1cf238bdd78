//! # Configuration Loading
//!
//! ## Sources (Priority Order)
//! 1. Environment variables (`PRICECHECK_*`)
//! 2. Config file (`--config`, else `<config dir>/pricecheck/config.toml`)
//! 3. Defaults
//!
//! An explicit `--config` path must exist. The platform default is optional.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use pricecheck_core::{ConfigError, DeploymentConfig};
use pricecheck_db::DbError;
use pricecheck_lookup::LookupError;

/// Everything that can stop a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DbError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("Failed to write output: {0}")]
    Output(#[from] serde_json::Error),
}

/// Loads, overrides and validates the deployment configuration.
pub fn load_config(explicit: Option<&Path>) -> Result<DeploymentConfig, ConfigError> {
    load_config_from(explicit, default_config_path(), |key| std::env::var(key).ok())
}

fn load_config_from<F>(
    explicit: Option<&Path>,
    default_path: Option<PathBuf>,
    env: F,
) -> Result<DeploymentConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match explicit {
        Some(path) => read_file(path)?,
        None => match default_path.filter(|path| path.is_file()) {
            Some(path) => read_file(&path)?,
            None => {
                debug!("No config file found, using defaults");
                DeploymentConfig::default()
            }
        },
    };

    let applied = config.apply_overrides(env)?;
    if !applied.is_empty() {
        info!(overrides = ?applied, "Applied environment overrides");
    }

    config.validate()?;
    Ok(config)
}

fn read_file(path: &Path) -> Result<DeploymentConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path.display(), e)))?;

    info!(path = %path.display(), "Loaded configuration file");
    DeploymentConfig::from_toml_str(&contents)
}

/// Returns the default config file path.
fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("com", "pricecheck", "pricecheck")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_plus_env() {
        let config = load_config_from(
            None,
            None,
            env(&[
                ("PRICECHECK_DATABASE_URL", "postgres://reader@db/retail"),
                ("PRICECHECK_QUERY_TIMEOUT_SECS", "9"),
            ]),
        )
        .unwrap();

        assert_eq!(config.database.url, "postgres://reader@db/retail");
        assert_eq!(config.lookup.query_timeout_secs, 9);
    }

    #[test]
    fn test_missing_url_fails_validation() {
        let result = load_config_from(None, None, env(&[]));
        assert!(matches!(result, Err(ConfigError::Required { .. })));
    }

    #[test]
    fn test_explicit_path_must_exist() {
        let path = Path::new("/nonexistent/pricecheck/config.toml");
        let result = load_config_from(Some(path), None, env(&[]));
        assert!(matches!(result, Err(ConfigError::LoadFailed(_))));
    }

    #[test]
    fn test_missing_default_path_is_fine() {
        let config = load_config_from(
            None,
            Some(PathBuf::from("/nonexistent/pricecheck/config.toml")),
            env(&[("PRICECHECK_DATABASE_URL", "postgres://reader@db/retail")]),
        )
        .unwrap();
        assert_eq!(config.schema.product_table, "ptype");
    }

    #[test]
    fn test_file_is_read() {
        let dir = std::env::temp_dir().join(format!("pricecheck-cli-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(
            &path,
            "[database]\nurl = \"postgres://reader@file/retail\"\n\n[schema]\nproduct_table = \"retail.goods\"\n",
        )
        .unwrap();

        let config = load_config_from(Some(&path), None, env(&[])).unwrap();
        assert_eq!(config.database.url, "postgres://reader@file/retail");
        assert_eq!(config.schema.product_table, "retail.goods");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
