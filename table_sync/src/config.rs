//! Configuration handling for table_sync

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

use crate::error::{Error, Result};

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete table_sync configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub type_mapping: TypeMappingConfig,
    pub logging: Option<LoggingConfig>,
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub driver: String,
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
}

/// Reconciliation behaviour
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SchemaConfig {
    #[serde(default = "default_true")]
    pub allow_column_removal: bool,
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            allow_column_removal: true,
            dry_run: false,
        }
    }
}

/// Naming conventions configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NamingConfig {
    #[serde(default = "default_index_pattern")]
    pub index_pattern: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            index_pattern: default_index_pattern(),
        }
    }
}

/// Type mapping configuration.
///
/// Keys are canonical type tags (`varchar`, `datetime`, ...), values the type
/// name the dialect should emit instead of its own.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct TypeMappingConfig {
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_true")]
    pub stdout: bool,
}

fn default_true() -> bool {
    true
}

fn default_index_pattern() -> String {
    "{table}_{columns}_idx".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}
