use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use grantvault_postgres::PostgresConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Looked up in the working directory when `--config` is not given.
const DEFAULT_CONFIG_FILE: &str = "grantvault.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub database: PostgresConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

pub fn load_file(path: &Path) -> Result<CliConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Invalid config file: {}", path.display()))
}

/// Resolves the effective configuration.
///
/// Precedence: flags and `GRANTVAULT_*` env vars, then the config file, then defaults.
pub fn resolve(cli: &Cli) -> Result<CliConfig> {
    let mut config = match config_path(cli.config.as_deref()) {
        Some(path) => load_file(&path)?,
        None => CliConfig::default(),
    };

    if let Some(url) = &cli.database_url {
        config.database.url = url.clone();
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    Ok(config)
}

fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let default = PathBuf::from(DEFAULT_CONFIG_FILE);
    default.exists().then_some(default)
}
